use std::time::Duration;

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;

/// Accumulated serialized size at which the batcher flushes regardless of chain state
pub const DEFAULT_BATCH_THRESHOLD_BYTES: u64 = 5_000_000;

/// Longest time a non-empty batch waits before being saved. A prime number of seconds, so the
/// save does not keep coinciding with other periodic housekeeping.
pub const DEFAULT_BATCH_MAX_SAVE_INTERVAL: Duration = Duration::from_secs(37);

/// Distance (in blocks) from the consensus tip within which every block is flushed immediately
pub const DEFAULT_FLUSH_DISTANCE: u64 = 5;

pub const DEFAULT_BLOCK_CACHE_SIZE_BYTES: u64 = 300 * MB;
pub const DEFAULT_BLOCK_CACHE_MIN_ITEMS: usize = 10;
pub const DEFAULT_TX_INDEX_CACHE_ENTRIES: usize = 100_000;

pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(30);

/// Number of blocks read per chunk while rebuilding the transaction index
pub const REINDEX_CHUNK_SIZE: usize = 1_000;
