mod batch;
mod pending;
mod processor;
mod store_tip;

pub use batch::{Batch, clean_batch};
pub use pending::PendingSet;
pub use processor::{BlockStoreMessage, BlockStoreProcessor};
pub use store_tip::StoreTipHandle;
pub(crate) use store_tip::StoreTipCell;
