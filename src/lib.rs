pub mod data;
pub mod error;
pub mod family;
pub mod initialization;
pub mod model;
pub mod optimization;
pub mod params;
pub mod storage;
pub mod training;

pub use data::CsrMatrix;
pub use error::{FtrlErr, Result};
pub use family::{Family, Link};
pub use model::{Ftrl, FtrlDump, ModelBuilder, ModelSpec, OnlineModel, StoreSpec};
pub use params::FtrlParams;
pub use storage::{AtomicStore, FeatureCell, LockedStore, Store};
