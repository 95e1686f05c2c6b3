use granary_blockstore_core::errors::{chain::ChainError, config::ConfigError};
use granary_database::prelude::StoreError;
use granary_hashes::Hash;
use std::fmt::Display;
use thiserror::Error;

/// The chain walk during which an integrity violation was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainWalk {
    ReorgCorrection,
    Recovery,
    Pruning,
}

impl Display for ChainWalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainWalk::ReorgCorrection => write!(f, "reorg correction"),
            ChainWalk::Recovery => write!(f, "store tip recovery"),
            ChainWalk::Pruning => write!(f, "pruning"),
        }
    }
}

/// The persisted chain contradicts itself. The node cannot repair this while running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("block {0} is missing from the store during {1}")]
    MissingBlock(Hash, ChainWalk),

    #[error("chain walk from {from} ran past genesis without reaching {target} during {walk}")]
    UnreachableAncestor { from: Hash, target: Hash, walk: ChainWalk },

    #[error("header at height {0} is missing below the canonical tip during {1}")]
    MissingHeight(u64, ChainWalk),
}

#[derive(Error, Debug)]
pub enum BlockStoreError {
    #[error("store integrity violation: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("the block store is shutting down")]
    ShuttingDown,

    #[error("the block store worker was already started")]
    AlreadyStarted,

    #[error("failed to spawn the block store worker: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("the block store worker panicked")]
    WorkerPanicked,
}

impl BlockStoreError {
    /// Fatal errors stop the node; anything else is retried by the next flush
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BlockStoreError::Integrity(_) | BlockStoreError::Config(_) | BlockStoreError::Chain(_) | BlockStoreError::WorkerPanicked
        )
    }
}

pub type BlockStoreResult<T> = std::result::Result<T, BlockStoreError>;
