pub mod store_processor;

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct BlockStoreCounters {
    pub blocks_submitted: AtomicU64,
    pub blocks_persisted: AtomicU64,
    pub blocks_dropped: AtomicU64,
    pub reorg_deleted: AtomicU64,
    pub flushes: AtomicU64,
    pub failed_flushes: AtomicU64,
    pub bytes_flushed: AtomicU64,
    pub prune_passes: AtomicU64,
}

impl BlockStoreCounters {
    pub fn snapshot(&self) -> BlockStoreCountersSnapshot {
        BlockStoreCountersSnapshot {
            blocks_submitted: self.blocks_submitted.load(Ordering::SeqCst),
            blocks_persisted: self.blocks_persisted.load(Ordering::SeqCst),
            blocks_dropped: self.blocks_dropped.load(Ordering::SeqCst),
            reorg_deleted: self.reorg_deleted.load(Ordering::SeqCst),
            flushes: self.flushes.load(Ordering::SeqCst),
            failed_flushes: self.failed_flushes.load(Ordering::SeqCst),
            bytes_flushed: self.bytes_flushed.load(Ordering::SeqCst),
            prune_passes: self.prune_passes.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStoreCountersSnapshot {
    pub blocks_submitted: u64,
    pub blocks_persisted: u64,
    /// Batch entries discarded because a later block in the same batch replaced their branch
    pub blocks_dropped: u64,
    /// Stored blocks deleted while correcting a reorg
    pub reorg_deleted: u64,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub bytes_flushed: u64,
    pub prune_passes: u64,
}
