use crate::prelude::DbKey;
use granary_hashes::Hash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("key {0} not found in store")]
    KeyNotFound(DbKey),

    #[error("key {0} already exists in store")]
    KeyAlreadyExists(String),

    /// Specialization of key already exists for the common `Hash` case.
    /// Added for avoiding the `String` allocation
    #[error("hash {0} already exists in store")]
    HashAlreadyExists(Hash),

    #[error("data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("rocksdb error {0}")]
    DbError(#[from] rocksdb::Error),

    #[error("bincode error {0}")]
    DeserializationError(#[from] Box<bincode::ErrorKind>),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Classifies store errors into the buckets callers branch on
pub trait StoreErrorPredicates {
    fn is_key_not_found(&self) -> bool;

    fn is_already_exists(&self) -> bool;
}

impl StoreErrorPredicates for StoreError {
    fn is_key_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound(_))
    }

    fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::KeyAlreadyExists(_) | StoreError::HashAlreadyExists(_))
    }
}

pub trait StoreResultExt<T, E: StoreErrorPredicates> {
    /// Maps a "key not found" error to `Ok(None)`, keeping every other error
    fn optional(self) -> Result<Option<T>, E>;
}

impl<T, E: StoreErrorPredicates> StoreResultExt<T, E> for Result<T, E> {
    fn optional(self) -> Result<Option<T>, E> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_key_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional() {
        let found: StoreResult<u8> = Ok(3);
        assert_eq!(found.optional().unwrap(), Some(3));
        let missing: StoreResult<u8> = Err(StoreError::KeyNotFound(DbKey::prefix_only(&[1])));
        assert_eq!(missing.optional().unwrap(), None);
        let broken: StoreResult<u8> = Err(StoreError::DataInconsistency("x".into()));
        assert!(broken.optional().is_err());
        assert!(StoreError::HashAlreadyExists(1.into()).is_already_exists());
    }
}
