use granary_hashes::Hash;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block {block} does not match chained header {header}")]
    HeaderBlockMismatch { block: Hash, header: Hash },

    #[error("header {child} points to parent {expected_parent} but was linked on top of {parent}")]
    NotAChild { child: Hash, expected_parent: Hash, parent: Hash },

    #[error("header {0} is not known to the chain index")]
    UnknownHeader(Hash),
}

pub type ChainResult<T> = std::result::Result<T, ChainError>;
