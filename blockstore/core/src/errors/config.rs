use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pruning cannot be enabled together with the transaction index")]
    PruningWithTxIndex,

    #[error("the store was built with txindex={stored}; rebuild it with reindex to switch to txindex={requested}")]
    TxIndexChangeRequiresReindex { stored: bool, requested: bool },

    #[error("prune retention depth {retention} is below the maximal reorg length {max_reorg}")]
    RetentionBelowMaxReorg { retention: u64, max_reorg: u64 },

    #[error("batch threshold must be positive")]
    InvalidBatchThreshold,
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
