use crate::{cache::CachePolicy, db::DB, errors::StoreError};

use super::prelude::{Cache, DbKey, DbWriter};
use granary_utils::mem_size::MemSizeEstimator;
use rocksdb::{Direction, IterateBounds, IteratorMode, ReadOptions};
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::hash_map::RandomState, error::Error, hash::BuildHasher, sync::Arc};

/// A concurrent DB store access with typed caching.
#[derive(Clone)]
pub struct CachedDbAccess<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
{
    db: Arc<DB>,

    // Cache
    cache: Cache<TKey, TData, S>,

    // DB bucket/path
    prefix: Vec<u8>,
}

pub type KeyDataResult<TData> = Result<(Box<[u8]>, TData), Box<dyn Error>>;

impl<TKey, TData, S> CachedDbAccess<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
    S: BuildHasher + Default,
{
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy, prefix: Vec<u8>) -> Self {
        Self { db, cache: Cache::new(cache_policy), prefix }
    }

    pub fn cache(&self) -> &Cache<TKey, TData, S> {
        &self.cache
    }

    pub fn read_from_cache(&self, key: TKey) -> Option<TData> {
        self.cache.get(&key)
    }

    pub fn has(&self, key: TKey) -> Result<bool, StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        Ok(self.cache.contains_key(&key) || self.has_in_db(key)?)
    }

    /// Checks the DB only, ignoring the cache, and without deserializing the value
    pub fn has_in_db(&self, key: TKey) -> Result<bool, StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        Ok(self.db.get_pinned(DbKey::new(&self.prefix, key))?.is_some())
    }

    pub fn read(&self, key: TKey) -> Result<TData, StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: DeserializeOwned, // We need `DeserializeOwned` since the slice coming from `db.get_pinned` has short lifetime
    {
        if let Some(data) = self.cache.get(&key) {
            Ok(data)
        } else {
            let db_key = DbKey::new(&self.prefix, key.clone());
            if let Some(slice) = self.db.get_pinned(&db_key)? {
                let data: TData = bincode::deserialize(&slice)?;
                self.cache.insert(key, data.clone());
                Ok(data)
            } else {
                Err(StoreError::KeyNotFound(db_key))
            }
        }
    }

    pub fn iterator(&self) -> impl Iterator<Item = KeyDataResult<TData>> + '_
    where
        TKey: AsRef<[u8]>,
        TData: DeserializeOwned,
    {
        self.seek_iterator(None, usize::MAX, false)
    }

    /// Iterates the store from `seek_from` (or its first key) in key order, yielding up to `limit`
    /// entries. `skip_first` drops the seek key itself, which lets callers resume a chunked scan
    /// from the last key they saw.
    pub fn seek_iterator(
        &self,
        seek_from: Option<TKey>,
        limit: usize,
        skip_first: bool,
    ) -> impl Iterator<Item = KeyDataResult<TData>> + '_
    where
        TKey: AsRef<[u8]>,
        TData: DeserializeOwned,
    {
        let prefix_key = DbKey::prefix_only(&self.prefix);
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_range(rocksdb::PrefixRange(prefix_key.as_ref()));

        let start = match seek_from {
            Some(seek_key) => DbKey::new(&self.prefix, seek_key),
            None => prefix_key.clone(),
        };
        let mut db_iterator = self.db.iterator_opt(IteratorMode::From(start.as_ref(), Direction::Forward), read_opts);

        if skip_first {
            db_iterator.next();
        }

        db_iterator.take(limit).map(move |item| match item {
            Ok((key_bytes, value_bytes)) => match bincode::deserialize::<TData>(value_bytes.as_ref()) {
                Ok(value) => Ok((key_bytes[prefix_key.prefix_len()..].into(), value)),
                Err(err) => Err(err.into()),
            },
            Err(err) => Err(err.into()),
        })
    }

    pub fn write(&self, mut writer: impl DbWriter, key: TKey, data: TData) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: Serialize,
    {
        let bin_data = bincode::serialize(&data)?;
        writer.put(DbKey::new(&self.prefix, key.clone()), bin_data)?;
        self.cache.insert(key, data);
        Ok(())
    }

    pub fn write_many(
        &self,
        mut writer: impl DbWriter,
        iter: &mut (impl Iterator<Item = (TKey, TData)> + Clone),
    ) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: Serialize,
    {
        let iter_clone = iter.clone();
        for (key, data) in iter_clone {
            let bin_data = bincode::serialize(&data)?;
            writer.put(DbKey::new(&self.prefix, key), bin_data)?;
        }
        self.cache.insert_many(iter);
        Ok(())
    }

    /// Stages the entries without touching the cache. Used with batch writers whose commit may
    /// still fail: once it succeeds the caller publishes the entries through [`Self::cache_many`].
    pub fn write_many_uncached<'a>(&self, mut writer: impl DbWriter, iter: impl Iterator<Item = (TKey, &'a TData)>) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: Serialize + 'a,
    {
        for (key, data) in iter {
            let bin_data = bincode::serialize(data)?;
            writer.put(DbKey::new(&self.prefix, key), bin_data)?;
        }
        Ok(())
    }

    pub fn cache_many(&self, iter: &mut impl Iterator<Item = (TKey, TData)>) {
        self.cache.insert_many(iter);
    }

    pub fn delete(&self, mut writer: impl DbWriter, key: TKey) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        self.cache.remove(&key);
        writer.delete(DbKey::new(&self.prefix, key))?;
        Ok(())
    }

    pub fn delete_many(&self, mut writer: impl DbWriter, key_iter: &mut (impl Iterator<Item = TKey> + Clone)) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        let key_iter_clone = key_iter.clone();
        self.cache.remove_many(key_iter);
        for key in key_iter_clone {
            writer.delete(DbKey::new(&self.prefix, key))?;
        }
        Ok(())
    }

    /// Deletes all entries in the store using the underlying rocksdb `delete_range` operation
    pub fn delete_all(&self, mut writer: impl DbWriter) -> Result<(), StoreError> {
        self.cache.remove_all();
        let db_key = DbKey::prefix_only(&self.prefix);
        let (from, to) = rocksdb::PrefixRange(db_key.as_ref()).into_bounds();
        match (from, to) {
            (Some(from), Some(to)) => writer.delete_range(from, to)?,
            _ => return Err(StoreError::DataInconsistency(format!("prefix {} has no closed key range", db_key))),
        }
        Ok(())
    }

    /// Compacts the key range of this store, physically dropping deleted entries
    pub fn compact(&self) {
        self.db.compact_prefix(DbKey::prefix_only(&self.prefix).as_ref());
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}
