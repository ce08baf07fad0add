mod builder;
mod dump;
mod ftrl;
mod online;
mod spec;

pub use builder::ModelBuilder;
pub use dump::FtrlDump;
pub use ftrl::Ftrl;
pub use online::OnlineModel;
pub use spec::{DEFAULT_SHARD_SIZE, ModelSpec, StoreSpec};
