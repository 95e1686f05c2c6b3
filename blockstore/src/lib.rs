//! Durable block storage for a full node.
//!
//! Validated blocks enter through [`store::BlockStore::add_to_pending`] and are readable
//! immediately. A background batcher groups them, reconciles the batch with reorgs the consensus
//! layer performed meanwhile and persists it atomically through the [`repository`]. On startup the
//! store tip is reconciled with the canonical chain and, when configured, old blocks are pruned.

pub mod errors;
pub mod model;
pub mod pipeline;
pub mod processes;
pub mod repository;
pub mod store;
pub mod test_helpers;

pub use store::BlockStore;
