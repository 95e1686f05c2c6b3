use arc_swap::ArcSwap;
use granary_blockstore_core::chain::ChainedHeader;
use granary_hashes::Hash;
use std::sync::Arc;

/// Read-only view of the durable store tip. Readers never block the batcher.
#[derive(Clone)]
pub struct StoreTipHandle {
    inner: Arc<ArcSwap<ChainedHeader>>,
}

impl StoreTipHandle {
    pub fn get(&self) -> Arc<ChainedHeader> {
        self.inner.load_full()
    }

    pub fn hash(&self) -> Hash {
        self.inner.load().hash()
    }

    pub fn height(&self) -> u64 {
        self.inner.load().height()
    }
}

/// The writable side, held only by the batcher
pub(crate) struct StoreTipCell {
    inner: Arc<ArcSwap<ChainedHeader>>,
}

impl StoreTipCell {
    pub fn new(initial: Arc<ChainedHeader>) -> Self {
        Self { inner: Arc::new(ArcSwap::new(initial)) }
    }

    pub fn handle(&self) -> StoreTipHandle {
        StoreTipHandle { inner: self.inner.clone() }
    }

    pub fn get(&self) -> Arc<ChainedHeader> {
        self.inner.load_full()
    }

    pub fn set(&self, tip: Arc<ChainedHeader>) {
        self.inner.store(tip);
    }
}
