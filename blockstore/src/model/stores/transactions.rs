use std::sync::Arc;

use granary_blockstore_core::{BlockHasher, tx::TransactionId};
use granary_database::{
    prelude::{BatchDbWriter, CacheCounters, CachePolicy, CachedDbAccess, DB, DirectDbWriter, StoreError, StoreResultExt},
    registry::DatabaseStorePrefixes,
};
use granary_hashes::Hash;
use rocksdb::WriteBatch;

pub trait TransactionsStoreReader {
    /// Returns the hash of the block holding transaction `id`
    fn get_block_hash(&self, id: TransactionId) -> Result<Option<Hash>, StoreError>;
}

pub trait TransactionsStore: TransactionsStoreReader {
    fn insert_batch(&self, batch: &mut WriteBatch, entries: &[(TransactionId, Hash)]) -> Result<(), StoreError>;
    fn delete_batch(&self, batch: &mut WriteBatch, ids: &[TransactionId]) -> Result<(), StoreError>;
    fn delete_all(&self) -> Result<(), StoreError>;
}

/// The transaction index: transaction id to owning block hash
#[derive(Clone)]
pub struct DbTransactionsStore {
    db: Arc<DB>,
    access: CachedDbAccess<TransactionId, Hash, BlockHasher>,
}

impl DbTransactionsStore {
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbAccess::new(db, cache_policy, DatabaseStorePrefixes::Transactions.into()) }
    }

    pub fn clone_with_new_cache(&self, cache_policy: CachePolicy) -> Self {
        Self::new(Arc::clone(&self.db), cache_policy)
    }

    pub fn publish(&self, entries: &[(TransactionId, Hash)]) {
        self.access.cache_many(&mut entries.iter().copied());
    }

    pub fn evict(&self, ids: &[TransactionId]) {
        self.access.cache().remove_many(&mut ids.iter().copied());
    }

    pub fn cache_counters(&self) -> Arc<CacheCounters> {
        self.access.cache().counters()
    }

    pub fn len(&self) -> usize {
        self.access.iterator().count()
    }

    pub fn is_empty(&self) -> bool {
        self.access.iterator().next().is_none()
    }

    pub fn compact(&self) {
        self.access.compact();
    }
}

impl TransactionsStoreReader for DbTransactionsStore {
    fn get_block_hash(&self, id: TransactionId) -> Result<Option<Hash>, StoreError> {
        self.access.read(id).optional()
    }
}

impl TransactionsStore for DbTransactionsStore {
    fn insert_batch(&self, batch: &mut WriteBatch, entries: &[(TransactionId, Hash)]) -> Result<(), StoreError> {
        self.access.write_many_uncached(BatchDbWriter::new(batch), entries.iter().map(|(id, hash)| (*id, hash)))
    }

    fn delete_batch(&self, batch: &mut WriteBatch, ids: &[TransactionId]) -> Result<(), StoreError> {
        self.access.delete_many(BatchDbWriter::new(batch), &mut ids.iter().copied())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.access.delete_all(DirectDbWriter::new(&self.db))
    }
}
