use std::sync::Arc;

use granary_blockstore_core::chain::HashHeightPair;
use granary_database::{
    prelude::{BatchDbWriter, CachedDbItem, DB, DbKey, DirectDbWriter, StoreError, StoreResultExt},
    registry::{CommonKeys, DatabaseStorePrefixes},
};
use rocksdb::WriteBatch;

pub trait CommonStoreReader {
    fn repository_tip(&self) -> Result<HashHeightPair, StoreError>;
    fn tx_index(&self) -> Result<bool, StoreError>;
    fn pruned_tip(&self) -> Result<Option<HashHeightPair>, StoreError>;
}

/// The fixed markers of the `Common` table
#[derive(Clone)]
pub struct DbCommonStore {
    db: Arc<DB>,
    repository_tip: CachedDbItem<HashHeightPair>,
    tx_index: CachedDbItem<bool>,
    pruned_tip: CachedDbItem<HashHeightPair>,
}

impl DbCommonStore {
    pub fn new(db: Arc<DB>) -> Self {
        let key = |marker: CommonKeys| DbKey::new(DatabaseStorePrefixes::Common.as_ref(), marker);
        Self {
            repository_tip: CachedDbItem::new(db.clone(), key(CommonKeys::RepositoryTip)),
            tx_index: CachedDbItem::new(db.clone(), key(CommonKeys::TxIndexFlag)),
            pruned_tip: CachedDbItem::new(db.clone(), key(CommonKeys::PrunedTip)),
            db,
        }
    }

    pub fn set_repository_tip_batch(&self, batch: &mut WriteBatch, tip: HashHeightPair) -> Result<(), StoreError> {
        self.repository_tip.write(BatchDbWriter::new(batch), &tip)
    }

    pub fn set_tx_index_batch(&self, batch: &mut WriteBatch, enabled: bool) -> Result<(), StoreError> {
        self.tx_index.write(BatchDbWriter::new(batch), &enabled)
    }

    pub fn set_tx_index(&self, enabled: bool) -> Result<(), StoreError> {
        self.tx_index.write(DirectDbWriter::new(&self.db), &enabled)
    }

    pub fn set_pruned_tip_batch(&self, batch: &mut WriteBatch, tip: HashHeightPair) -> Result<(), StoreError> {
        self.pruned_tip.write(BatchDbWriter::new(batch), &tip)
    }

    pub fn set_pruned_tip(&self, tip: HashHeightPair) -> Result<(), StoreError> {
        self.pruned_tip.write(DirectDbWriter::new(&self.db), &tip)
    }

    /// Forgets staged values after an abandoned batch
    pub fn invalidate(&self) {
        self.repository_tip.invalidate();
        self.tx_index.invalidate();
        self.pruned_tip.invalidate();
    }
}

impl CommonStoreReader for DbCommonStore {
    fn repository_tip(&self) -> Result<HashHeightPair, StoreError> {
        self.repository_tip.read()
    }

    fn tx_index(&self) -> Result<bool, StoreError> {
        Ok(self.tx_index.read().optional()?.unwrap_or_default())
    }

    fn pruned_tip(&self) -> Result<Option<HashHeightPair>, StoreError> {
        self.pruned_tip.read().optional()
    }
}
