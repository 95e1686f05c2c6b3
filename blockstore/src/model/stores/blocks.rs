use std::sync::Arc;

use granary_blockstore_core::{BlockHasher, block::Block};
use granary_database::{
    prelude::{BatchDbWriter, CacheCounters, CachePolicy, CachedDbAccess, DB, KeyDataResult, StoreError, StoreResultExt},
    registry::DatabaseStorePrefixes,
};
use granary_hashes::Hash;
use rocksdb::WriteBatch;

pub trait BlocksStoreReader {
    fn get(&self, hash: Hash) -> Result<Arc<Block>, StoreError>;
    fn get_optional(&self, hash: Hash) -> Result<Option<Arc<Block>>, StoreError>;
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;
}

pub trait BlocksStore: BlocksStoreReader {
    /// Stages `blocks` into `batch` without caching them; see [`DbBlocksStore::publish`]
    fn insert_batch<'a>(&self, batch: &mut WriteBatch, blocks: impl Iterator<Item = &'a Arc<Block>>) -> Result<(), StoreError>;
    fn delete_batch(&self, batch: &mut WriteBatch, hashes: &[Hash]) -> Result<(), StoreError>;
}

/// A DB + cache implementation of the `BlocksStore` trait, with concurrency support.
#[derive(Clone)]
pub struct DbBlocksStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, Arc<Block>, BlockHasher>,
}

impl DbBlocksStore {
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbAccess::new(db, cache_policy, DatabaseStorePrefixes::Blocks.into()) }
    }

    pub fn clone_with_new_cache(&self, cache_policy: CachePolicy) -> Self {
        Self::new(Arc::clone(&self.db), cache_policy)
    }

    /// Checks the DB only. Blocks staged in an uncommitted batch are invisible here.
    pub fn has_in_db(&self, hash: Hash) -> Result<bool, StoreError> {
        self.access.has_in_db(hash)
    }

    /// Makes committed blocks visible through the cache
    pub fn publish<'a>(&self, blocks: impl Iterator<Item = &'a Arc<Block>>) {
        self.access.cache_many(&mut blocks.map(|block| (block.hash(), block.clone())));
    }

    /// Drops committed deletions from the cache, covering reads that raced the commit
    pub fn evict(&self, hashes: &[Hash]) {
        self.access.cache().remove_many(&mut hashes.iter().copied());
    }

    /// Reads up to `limit` stored blocks in key order, starting after `after` when given
    pub fn chunk(&self, after: Option<Hash>, limit: usize) -> impl Iterator<Item = KeyDataResult<Arc<Block>>> + '_ {
        self.access.seek_iterator(after, limit, after.is_some())
    }

    pub fn cache_counters(&self) -> Arc<CacheCounters> {
        self.access.cache().counters()
    }

    pub fn compact(&self) {
        self.access.compact();
    }
}

impl BlocksStoreReader for DbBlocksStore {
    fn get(&self, hash: Hash) -> Result<Arc<Block>, StoreError> {
        self.access.read(hash)
    }

    fn get_optional(&self, hash: Hash) -> Result<Option<Arc<Block>>, StoreError> {
        self.access.read(hash).optional()
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.access.has(hash)
    }
}

impl BlocksStore for DbBlocksStore {
    fn insert_batch<'a>(&self, batch: &mut WriteBatch, blocks: impl Iterator<Item = &'a Arc<Block>>) -> Result<(), StoreError> {
        let entries: Vec<(Hash, &Arc<Block>)> = blocks.map(|block| (block.hash(), block)).collect();
        self.access.write_many_uncached(BatchDbWriter::new(batch), entries.into_iter())
    }

    fn delete_batch(&self, batch: &mut WriteBatch, hashes: &[Hash]) -> Result<(), StoreError> {
        self.access.delete_many(BatchDbWriter::new(batch), &mut hashes.iter().copied())
    }
}
