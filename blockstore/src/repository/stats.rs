use granary_database::prelude::CacheCountersSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct RepositoryCounters {
    pub blocks_written: AtomicU64,
    pub block_hits: AtomicU64,
    pub blocks_deleted: AtomicU64,
    pub tx_entries_written: AtomicU64,
    pub tx_entries_deleted: AtomicU64,
    pub commits: AtomicU64,
    pub failed_commits: AtomicU64,
}

impl RepositoryCounters {
    pub fn snapshot(&self) -> RepositoryCountersSnapshot {
        RepositoryCountersSnapshot {
            blocks_written: self.blocks_written.load(Ordering::SeqCst),
            block_hits: self.block_hits.load(Ordering::SeqCst),
            blocks_deleted: self.blocks_deleted.load(Ordering::SeqCst),
            tx_entries_written: self.tx_entries_written.load(Ordering::SeqCst),
            tx_entries_deleted: self.tx_entries_deleted.load(Ordering::SeqCst),
            commits: self.commits.load(Ordering::SeqCst),
            failed_commits: self.failed_commits.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryCountersSnapshot {
    pub blocks_written: u64,
    /// Blocks handed to `put_blocks` that were already stored
    pub block_hits: u64,
    pub blocks_deleted: u64,
    pub tx_entries_written: u64,
    pub tx_entries_deleted: u64,
    pub commits: u64,
    pub failed_commits: u64,
}

/// Statistics a repository may expose through [`super::BlockRepository::stats`]
pub trait RepositoryStats {
    fn counters(&self) -> RepositoryCountersSnapshot;

    fn block_cache(&self) -> CacheCountersSnapshot;

    fn tx_index_cache(&self) -> CacheCountersSnapshot;
}
