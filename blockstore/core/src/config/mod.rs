pub mod constants;

use crate::errors::config::{ConfigError, ConfigResult};
use constants::*;
use std::time::Duration;

/// Block store configuration. Use `StoreConfig::new` for the defaults and [`ConfigBuilder`] for
/// anything else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Index every transaction id to its owning block hash
    pub tx_index: bool,

    /// Rebuild (or clear) the transaction index on startup
    pub reindex: bool,

    /// Number of blocks kept below the repository tip; 0 disables pruning
    pub prune_retention_depth: u64,

    /// Deepest reorg the consensus layer may perform. When non-zero, pruning must retain at least this many blocks.
    pub max_reorg_length: u64,

    /// Byte budget of the block cache
    pub block_cache_size: u64,
    pub block_cache_min_items: usize,
    pub tx_index_cache_entries: usize,

    pub batch_threshold_bytes: u64,
    pub batch_max_save_interval: Duration,
    pub flush_distance: u64,

    pub prune_interval: Duration,
    pub stats_interval: Duration,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            tx_index: false,
            reindex: false,
            prune_retention_depth: 0,
            max_reorg_length: 0,
            block_cache_size: DEFAULT_BLOCK_CACHE_SIZE_BYTES,
            block_cache_min_items: DEFAULT_BLOCK_CACHE_MIN_ITEMS,
            tx_index_cache_entries: DEFAULT_TX_INDEX_CACHE_ENTRIES,
            batch_threshold_bytes: DEFAULT_BATCH_THRESHOLD_BYTES,
            batch_max_save_interval: DEFAULT_BATCH_MAX_SAVE_INTERVAL,
            flush_distance: DEFAULT_FLUSH_DISTANCE,
            prune_interval: DEFAULT_PRUNE_INTERVAL,
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }

    pub fn is_pruning_enabled(&self) -> bool {
        self.prune_retention_depth > 0
    }

    /// Checks the settings that conflict regardless of what is on disk
    pub fn validate(&self) -> ConfigResult<()> {
        if self.is_pruning_enabled() && self.tx_index {
            return Err(ConfigError::PruningWithTxIndex);
        }
        if self.is_pruning_enabled() && self.max_reorg_length > 0 && self.prune_retention_depth < self.max_reorg_length {
            return Err(ConfigError::RetentionBelowMaxReorg { retention: self.prune_retention_depth, max_reorg: self.max_reorg_length });
        }
        if self.batch_threshold_bytes == 0 {
            return Err(ConfigError::InvalidBatchThreshold);
        }
        Ok(())
    }

    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder { config: self.clone() }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ConfigBuilder {
    config: StoreConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self { config: StoreConfig::new() }
    }

    pub fn apply_args<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut StoreConfig),
    {
        edit_func(&mut self.config);
        self
    }

    pub fn enable_tx_index(mut self) -> Self {
        self.config.tx_index = true;
        self
    }

    pub fn set_reindex(mut self) -> Self {
        self.config.reindex = true;
        self
    }

    pub fn set_prune_retention_depth(mut self, depth: u64) -> Self {
        self.config.prune_retention_depth = depth;
        self
    }

    pub fn set_max_reorg_length(mut self, length: u64) -> Self {
        self.config.max_reorg_length = length;
        self
    }

    pub fn set_block_cache_size(mut self, bytes: u64) -> Self {
        self.config.block_cache_size = bytes;
        self
    }

    pub fn set_batch_threshold_bytes(mut self, bytes: u64) -> Self {
        self.config.batch_threshold_bytes = bytes;
        self
    }

    pub fn set_batch_max_save_interval(mut self, interval: Duration) -> Self {
        self.config.batch_max_save_interval = interval;
        self
    }

    pub fn set_flush_distance(mut self, distance: u64) -> Self {
        self.config.flush_distance = distance;
        self
    }

    pub fn set_prune_interval(mut self, interval: Duration) -> Self {
        self.config.prune_interval = interval;
        self
    }

    pub fn set_stats_interval(mut self, interval: Duration) -> Self {
        self.config.stats_interval = interval;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StoreConfig::new();
        assert!(config.validate().is_ok());
        assert!(!config.is_pruning_enabled());
        assert_eq!(config.batch_threshold_bytes, 5_000_000);
        assert_eq!(config.batch_max_save_interval, Duration::from_secs(37));
    }

    #[test]
    fn test_conflicts() {
        let config = ConfigBuilder::new().enable_tx_index().set_prune_retention_depth(10).build();
        assert_eq!(config.validate(), Err(ConfigError::PruningWithTxIndex));

        let config = ConfigBuilder::new().set_prune_retention_depth(10).set_max_reorg_length(500).build();
        assert_eq!(config.validate(), Err(ConfigError::RetentionBelowMaxReorg { retention: 10, max_reorg: 500 }));

        let config = ConfigBuilder::new().apply_args(|c| c.batch_threshold_bytes = 0).build();
        assert_eq!(config.validate(), Err(ConfigError::InvalidBatchThreshold));

        let config = config.to_builder().set_batch_threshold_bytes(1).set_prune_retention_depth(600).build();
        assert!(config.validate().is_ok());
    }
}
