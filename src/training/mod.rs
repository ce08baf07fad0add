mod batch;
mod row;

pub(crate) use batch::mix;
pub use batch::{Batch, BatchRunner};
pub use row::{RowEngine, RowInput};
