mod shard;
mod store;

pub use shard::LockedShard;
pub use store::LockedStore;
