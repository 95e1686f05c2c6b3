use crate::{db::DB, errors::StoreError};

use super::prelude::{DbKey, DbWriter};
use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// A singleton value stored under a fixed key, cached in memory after the first read
#[derive(Clone)]
pub struct CachedDbItem<T> {
    db: Arc<DB>,
    key: DbKey,
    cached_item: Arc<RwLock<Option<T>>>,
}

impl<T> CachedDbItem<T> {
    pub fn new(db: Arc<DB>, key: DbKey) -> Self {
        Self { db, key, cached_item: Arc::new(RwLock::new(None)) }
    }

    pub fn read(&self) -> Result<T, StoreError>
    where
        T: Clone + DeserializeOwned,
    {
        if let Some(item) = self.cached_item.read().clone() {
            return Ok(item);
        }
        if let Some(slice) = self.db.get_pinned(&self.key)? {
            let item: T = bincode::deserialize(&slice)?;
            *self.cached_item.write() = Some(item.clone());
            Ok(item)
        } else {
            Err(StoreError::KeyNotFound(self.key.clone()))
        }
    }

    /// Stages the new value. With a batch writer the in-memory copy is ahead of the DB until the
    /// batch commits, so callers that might abandon the batch must call [`Self::invalidate`].
    pub fn write(&self, mut writer: impl DbWriter, item: &T) -> Result<(), StoreError>
    where
        T: Clone + Serialize,
    {
        let bin_data = bincode::serialize(item)?;
        writer.put(&self.key, bin_data)?;
        *self.cached_item.write() = Some(item.clone());
        Ok(())
    }

    pub fn remove(&self, mut writer: impl DbWriter) -> Result<(), StoreError> {
        writer.delete(&self.key)?;
        *self.cached_item.write() = None;
        Ok(())
    }

    /// Drops the in-memory copy so the next read goes to the DB
    pub fn invalidate(&self) {
        *self.cached_item.write() = None;
    }
}
