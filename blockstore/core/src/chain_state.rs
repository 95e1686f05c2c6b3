use crate::chain::ChainedHeader;
use parking_lot::RwLock;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Node-wide sync state as seen by the block store
pub trait ChainState: Send + Sync {
    fn is_at_best_chain_tip(&self) -> bool;

    fn is_initial_block_download(&self) -> bool;

    /// Receives every new durable store tip
    fn set_block_store_tip(&self, tip: Arc<ChainedHeader>);
}

pub type DynChainState = Arc<dyn ChainState>;

/// A [`ChainState`] backed by plain flags, set by whoever tracks sync progress
#[derive(Default)]
pub struct ChainStateFlags {
    at_best_chain_tip: AtomicBool,
    initial_block_download: AtomicBool,
    block_store_tip: RwLock<Option<Arc<ChainedHeader>>>,
}

impl ChainStateFlags {
    pub fn new(at_best_chain_tip: bool, initial_block_download: bool) -> Self {
        Self {
            at_best_chain_tip: AtomicBool::new(at_best_chain_tip),
            initial_block_download: AtomicBool::new(initial_block_download),
            block_store_tip: RwLock::new(None),
        }
    }

    pub fn set_at_best_chain_tip(&self, value: bool) {
        self.at_best_chain_tip.store(value, Ordering::Release);
    }

    pub fn set_initial_block_download(&self, value: bool) {
        self.initial_block_download.store(value, Ordering::Release);
    }

    pub fn block_store_tip(&self) -> Option<Arc<ChainedHeader>> {
        self.block_store_tip.read().clone()
    }
}

impl ChainState for ChainStateFlags {
    fn is_at_best_chain_tip(&self) -> bool {
        self.at_best_chain_tip.load(Ordering::Acquire)
    }

    fn is_initial_block_download(&self) -> bool {
        self.initial_block_download.load(Ordering::Acquire)
    }

    fn set_block_store_tip(&self, tip: Arc<ChainedHeader>) {
        *self.block_store_tip.write() = Some(tip);
    }
}
