mod shard;
mod store;

pub use shard::AtomicShard;
pub use store::AtomicStore;
