mod atomic;
mod cell;
mod locked;
mod store;

pub use atomic::{AtomicShard, AtomicStore};
pub use cell::FeatureCell;
pub use locked::{LockedShard, LockedStore};
pub use store::Store;
