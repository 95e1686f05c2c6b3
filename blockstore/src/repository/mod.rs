//! The durable system of record: blocks by hash, the optional transaction index and the
//! repository markers, all behind one atomic write path.

pub mod stats;

use crate::{
    errors::{BlockStoreError, BlockStoreResult},
    model::stores::{
        blocks::{BlocksStore, BlocksStoreReader, DbBlocksStore},
        common::{CommonStoreReader, DbCommonStore},
        transactions::{DbTransactionsStore, TransactionsStore, TransactionsStoreReader},
    },
};
use granary_blockstore_core::{
    BlockHashSet,
    block::Block,
    chain::HashHeightPair,
    config::{StoreConfig, constants::REINDEX_CHUNK_SIZE},
    errors::config::ConfigError,
    tx::{Transaction, TransactionId},
};
use granary_core::{debug, info, trace};
use granary_database::prelude::{CachePolicy, CacheCountersSnapshot, DB, StoreError, StoreResultExt};
use granary_hashes::{Hash, ZERO_HASH};
use granary_utils::mem_size::MemMode;
use parking_lot::{Mutex, RwLock};
use rocksdb::WriteBatch;
use stats::{RepositoryCounters, RepositoryCountersSnapshot, RepositoryStats};
use std::sync::{Arc, atomic::Ordering};

pub trait BlockRepository: Send + Sync {
    /// Creates the markers of an empty store and stores `genesis`. A no-op on an initialized store.
    fn initialize(&self, genesis: &Arc<Block>) -> BlockStoreResult<()>;

    /// Atomically writes every block not yet stored, indexes their transactions when the tx
    /// index is on, and moves the repository tip to `new_tip`
    fn put_blocks(&self, new_tip: HashHeightPair, blocks: &[Arc<Block>]) -> BlockStoreResult<()>;

    fn get_block(&self, hash: Hash) -> BlockStoreResult<Option<Arc<Block>>>;

    /// Returns one entry per requested hash, in request order
    fn get_blocks(&self, hashes: &[Hash]) -> BlockStoreResult<Vec<Option<Arc<Block>>>> {
        hashes.iter().map(|hash| self.get_block(*hash)).collect()
    }

    fn exists(&self, hash: Hash) -> BlockStoreResult<bool>;

    /// Atomically removes `hashes` with their index entries and moves the repository tip to `new_tip`
    fn delete(&self, new_tip: HashHeightPair, hashes: &[Hash]) -> BlockStoreResult<()>;

    /// Removes `hashes` without moving the repository tip
    fn delete_blocks(&self, hashes: &[Hash]) -> BlockStoreResult<()>;

    fn get_transaction_by_id(&self, id: TransactionId) -> BlockStoreResult<Option<Transaction>>;

    fn get_transactions_by_ids(&self, ids: &[TransactionId]) -> BlockStoreResult<Vec<Option<Transaction>>> {
        ids.iter().map(|id| self.get_transaction_by_id(*id)).collect()
    }

    fn get_block_id_by_transaction_id(&self, id: TransactionId) -> BlockStoreResult<Option<Hash>>;

    fn get_block_ids_by_transaction_ids(&self, ids: &[TransactionId]) -> BlockStoreResult<Vec<Option<Hash>>> {
        ids.iter().map(|id| self.get_block_id_by_transaction_id(*id)).collect()
    }

    fn tip(&self) -> BlockStoreResult<HashHeightPair>;

    fn tx_index(&self) -> BlockStoreResult<bool>;

    /// Switches the transaction index. Switching it on a store holding more than genesis
    /// requires `reindex_requested`.
    fn set_tx_index(&self, enabled: bool, reindex_requested: bool) -> BlockStoreResult<()>;

    /// Rebuilds the transaction index from the stored blocks, or clears it when the index is off
    fn reindex(&self) -> BlockStoreResult<()>;

    fn pruned_tip(&self) -> BlockStoreResult<Option<HashHeightPair>>;

    fn set_pruned_tip(&self, pruned_tip: HashHeightPair) -> BlockStoreResult<()>;

    /// Reclaims the space of deleted entries
    fn compact(&self);

    /// Repositories that keep statistics expose them here
    fn stats(&self) -> Option<&dyn RepositoryStats> {
        None
    }
}

pub type DynBlockRepository = Arc<dyn BlockRepository>;

/// A RocksDB implementation of [`BlockRepository`]
pub struct DbBlockRepository {
    db: Arc<DB>,

    // Stores
    blocks: DbBlocksStore,
    transactions: DbTransactionsStore,
    common: DbCommonStore,

    // Held by every mutation so staged batches never interleave
    mutation_lock: Mutex<()>,

    // Shared by reads that may fill a cache, exclusive across a deletion and its eviction,
    // so a removed entry cannot be cached again by a read that began before the commit
    deletion_lock: RwLock<()>,

    counters: RepositoryCounters,
}

impl DbBlockRepository {
    pub fn new(db: Arc<DB>, config: &StoreConfig) -> Self {
        let block_cache_policy = CachePolicy::Tracked {
            max_size: config.block_cache_size as usize,
            min_items: config.block_cache_min_items,
            mem_mode: MemMode::Bytes,
        };
        Self {
            blocks: DbBlocksStore::new(db.clone(), block_cache_policy),
            transactions: DbTransactionsStore::new(db.clone(), CachePolicy::Count(config.tx_index_cache_entries)),
            common: DbCommonStore::new(db.clone()),
            db,
            mutation_lock: Mutex::new(()),
            deletion_lock: RwLock::new(()),
            counters: Default::default(),
        }
    }

    fn commit(&self, batch: WriteBatch) -> BlockStoreResult<()> {
        match self.db.write(batch) {
            Ok(()) => {
                self.counters.commits.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                // Staged markers were cached ahead of the batch
                self.common.invalidate();
                self.counters.failed_commits.fetch_add(1, Ordering::Relaxed);
                Err(StoreError::from(err).into())
            }
        }
    }

    /// Index entries of `blocks`, sorted by transaction id. Genesis outputs are unspendable and are never indexed.
    fn tx_entries<'a>(blocks: impl Iterator<Item = &'a Arc<Block>>) -> Vec<(TransactionId, Hash)> {
        let mut entries: Vec<(TransactionId, Hash)> = blocks
            .filter(|block| block.prev_hash() != ZERO_HASH)
            .flat_map(|block| block.transactions.iter().map(move |tx| (tx.id(), block.hash())))
            .collect();
        // Stable, so when two blocks carry the same transaction the one later in `blocks` wins
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Stages the removal of `hashes`, returning the sorted hashes and index entries removed
    fn stage_deletion(&self, batch: &mut WriteBatch, hashes: &[Hash]) -> BlockStoreResult<(Vec<Hash>, Vec<TransactionId>)> {
        let mut hashes = hashes.to_vec();
        hashes.sort_unstable();
        hashes.dedup();

        let mut tx_ids = Vec::new();
        if self.tx_index()? {
            for hash in hashes.iter().copied() {
                if let Some(block) = self.blocks.get_optional(hash)? {
                    tx_ids.extend(block.transactions.iter().map(|tx| tx.id()));
                }
            }
            tx_ids.sort_unstable();
            tx_ids.dedup();
        }

        self.blocks.delete_batch(batch, &hashes)?;
        self.transactions.delete_batch(batch, &tx_ids)?;
        Ok((hashes, tx_ids))
    }

    fn finish_deletion(&self, hashes: &[Hash], tx_ids: &[TransactionId]) {
        self.blocks.evict(hashes);
        self.transactions.evict(tx_ids);
        self.counters.blocks_deleted.fetch_add(hashes.len() as u64, Ordering::Relaxed);
        self.counters.tx_entries_deleted.fetch_add(tx_ids.len() as u64, Ordering::Relaxed);
    }

    fn indexed_block_id(&self, id: TransactionId) -> BlockStoreResult<Option<Hash>> {
        if !self.tx_index()? {
            trace!("Transaction index is disabled, cannot look up {}", id);
            return Ok(None);
        }
        Ok(self.transactions.get_block_hash(id)?)
    }

    fn rebuild_tx_index(&self) -> BlockStoreResult<()> {
        let mut after: Option<Hash> = None;
        let mut total = 0u64;
        loop {
            let chunk = self
                .blocks
                .chunk(after, REINDEX_CHUNK_SIZE)
                .map(|item| item.map(|(_, block)| block).map_err(|err| StoreError::DataInconsistency(err.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            let Some(last) = chunk.last() else {
                break;
            };
            after = Some(last.hash());

            let entries = Self::tx_entries(chunk.iter());
            let mut batch = WriteBatch::default();
            self.transactions.insert_batch(&mut batch, &entries)?;
            self.commit(batch)?;

            total += chunk.len() as u64;
            self.counters.tx_entries_written.fetch_add(entries.len() as u64, Ordering::Relaxed);
            info!("Reindexed transactions of {} blocks", total);
        }
        Ok(())
    }
}

impl BlockRepository for DbBlockRepository {
    fn initialize(&self, genesis: &Arc<Block>) -> BlockStoreResult<()> {
        let _guard = self.mutation_lock.lock();
        if self.common.repository_tip().optional()?.is_some() {
            return Ok(());
        }

        let genesis_tip = HashHeightPair::new(genesis.hash(), 0);
        let mut batch = WriteBatch::default();
        self.blocks.insert_batch(&mut batch, std::iter::once(genesis))?;
        self.common.set_repository_tip_batch(&mut batch, genesis_tip)?;
        self.common.set_tx_index_batch(&mut batch, false)?;
        self.common.set_pruned_tip_batch(&mut batch, genesis_tip)?;
        self.commit(batch)?;
        self.blocks.publish(std::iter::once(genesis));
        info!("Initialized an empty block store at genesis {}", genesis.hash());
        Ok(())
    }

    fn put_blocks(&self, new_tip: HashHeightPair, blocks: &[Arc<Block>]) -> BlockStoreResult<()> {
        let _guard = self.mutation_lock.lock();

        let mut seen = BlockHashSet::default();
        let mut fresh = Vec::with_capacity(blocks.len());
        let mut hits = 0u64;
        for block in blocks.iter().filter(|block| seen.insert(block.hash())) {
            if self.blocks.has_in_db(block.hash())? {
                hits += 1;
            } else {
                fresh.push(block);
            }
        }

        // Indexed in chain order, so a transaction repeated by a descendant maps to the descendant
        let tx_entries = if self.tx_index()? { Self::tx_entries(fresh.iter().copied()) } else { Vec::new() };

        // Keys are written in byte order, a sequential pattern for the LSM tree
        let mut sorted = fresh.clone();
        sorted.sort_unstable_by_key(|block| block.hash());

        let mut batch = WriteBatch::default();
        self.blocks.insert_batch(&mut batch, sorted.iter().copied())?;
        self.transactions.insert_batch(&mut batch, &tx_entries)?;
        self.common.set_repository_tip_batch(&mut batch, new_tip)?;
        self.commit(batch)?;

        self.blocks.publish(fresh.iter().copied());
        self.transactions.publish(&tx_entries);

        self.counters.blocks_written.fetch_add(fresh.len() as u64, Ordering::Relaxed);
        self.counters.block_hits.fetch_add(hits, Ordering::Relaxed);
        self.counters.tx_entries_written.fetch_add(tx_entries.len() as u64, Ordering::Relaxed);
        trace!("Stored {} blocks ({} already present), repository tip {}", fresh.len(), hits, new_tip);
        Ok(())
    }

    fn get_block(&self, hash: Hash) -> BlockStoreResult<Option<Arc<Block>>> {
        let _read = self.deletion_lock.read();
        Ok(self.blocks.get_optional(hash)?)
    }

    fn exists(&self, hash: Hash) -> BlockStoreResult<bool> {
        let _read = self.deletion_lock.read();
        Ok(self.blocks.has(hash)?)
    }

    fn delete(&self, new_tip: HashHeightPair, hashes: &[Hash]) -> BlockStoreResult<()> {
        let _guard = self.mutation_lock.lock();
        let _deletion = self.deletion_lock.write();
        let mut batch = WriteBatch::default();
        let (hashes, tx_ids) = self.stage_deletion(&mut batch, hashes)?;
        self.common.set_repository_tip_batch(&mut batch, new_tip)?;
        self.commit(batch)?;
        self.finish_deletion(&hashes, &tx_ids);
        debug!("Deleted {} blocks, repository tip {}", hashes.len(), new_tip);
        Ok(())
    }

    fn delete_blocks(&self, hashes: &[Hash]) -> BlockStoreResult<()> {
        let _guard = self.mutation_lock.lock();
        let _deletion = self.deletion_lock.write();
        let mut batch = WriteBatch::default();
        let (hashes, tx_ids) = self.stage_deletion(&mut batch, hashes)?;
        self.commit(batch)?;
        self.finish_deletion(&hashes, &tx_ids);
        Ok(())
    }

    fn get_transaction_by_id(&self, id: TransactionId) -> BlockStoreResult<Option<Transaction>> {
        let _read = self.deletion_lock.read();
        let Some(block_hash) = self.indexed_block_id(id)? else {
            return Ok(None);
        };
        let Some(block) = self.blocks.get_optional(block_hash)? else {
            debug!("Transaction {} is indexed to block {} which is not stored", id, block_hash);
            return Ok(None);
        };
        Ok(block.transactions.iter().find(|tx| tx.id() == id).cloned())
    }

    fn get_block_id_by_transaction_id(&self, id: TransactionId) -> BlockStoreResult<Option<Hash>> {
        let _read = self.deletion_lock.read();
        self.indexed_block_id(id)
    }

    fn tip(&self) -> BlockStoreResult<HashHeightPair> {
        Ok(self.common.repository_tip()?)
    }

    fn tx_index(&self) -> BlockStoreResult<bool> {
        Ok(self.common.tx_index()?)
    }

    fn set_tx_index(&self, enabled: bool, reindex_requested: bool) -> BlockStoreResult<()> {
        let _guard = self.mutation_lock.lock();
        let stored = self.common.tx_index()?;
        if stored == enabled {
            return Ok(());
        }
        if self.common.repository_tip()?.height > 0 && !reindex_requested {
            return Err(BlockStoreError::Config(ConfigError::TxIndexChangeRequiresReindex { stored, requested: enabled }));
        }
        self.common.set_tx_index(enabled)?;
        info!("Transaction index switched {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    fn reindex(&self) -> BlockStoreResult<()> {
        let _guard = self.mutation_lock.lock();
        info!("Clearing the transaction index");
        {
            let _deletion = self.deletion_lock.write();
            self.transactions.delete_all()?;
        }
        if self.common.tx_index()? {
            info!("Rebuilding the transaction index from stored blocks");
            self.rebuild_tx_index()?;
        }
        self.transactions.compact();
        Ok(())
    }

    fn pruned_tip(&self) -> BlockStoreResult<Option<HashHeightPair>> {
        Ok(self.common.pruned_tip()?)
    }

    fn set_pruned_tip(&self, pruned_tip: HashHeightPair) -> BlockStoreResult<()> {
        let _guard = self.mutation_lock.lock();
        Ok(self.common.set_pruned_tip(pruned_tip)?)
    }

    fn compact(&self) {
        self.blocks.compact();
        self.transactions.compact();
    }

    fn stats(&self) -> Option<&dyn RepositoryStats> {
        Some(self)
    }
}

impl RepositoryStats for DbBlockRepository {
    fn counters(&self) -> RepositoryCountersSnapshot {
        self.counters.snapshot()
    }

    fn block_cache(&self) -> CacheCountersSnapshot {
        self.blocks.cache_counters().snapshot()
    }

    fn tx_index_cache(&self) -> CacheCountersSnapshot {
        self.transactions.cache_counters().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ChainBuilder, TEST_BITS, TEST_BLOCK_VERSION};
    use granary_blockstore_core::config::ConfigBuilder;
    use granary_database::{create_temp_db, prelude::ConnBuilder};
    use std::{thread, time::Duration};

    fn blocks_of(items: &[granary_blockstore_core::chain::ChainedHeaderBlock]) -> Vec<Arc<Block>> {
        items.iter().map(|item| item.block().clone()).collect()
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let repository = DbBlockRepository::new(db.clone(), &StoreConfig::default());
        let builder = ChainBuilder::from_genesis();
        let genesis = builder.genesis().block().clone();

        repository.initialize(&genesis).unwrap();
        let tip = repository.tip().unwrap();
        assert_eq!(tip, HashHeightPair::new(genesis.hash(), 0));
        assert_eq!(repository.pruned_tip().unwrap(), Some(tip));
        assert!(!repository.tx_index().unwrap());
        assert!(repository.exists(genesis.hash()).unwrap());

        let next = HashHeightPair::new(7.into(), 1);
        repository.put_blocks(next, &[]).unwrap();
        repository.initialize(&genesis).unwrap();
        assert_eq!(repository.tip().unwrap(), next);
    }

    #[test]
    fn test_get_blocks_preserves_request_order() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let repository = DbBlockRepository::new(db.clone(), &StoreConfig::default());
        let mut builder = ChainBuilder::from_genesis();
        repository.initialize(builder.genesis().block()).unwrap();

        let chain = builder.extend(3);
        repository.put_blocks(builder.tip().hash_height(), &blocks_of(&chain)).unwrap();

        let missing: Hash = 0xdead.into();
        let (b1, b2, b3) = (chain[0].hash(), chain[1].hash(), chain[2].hash());
        let found = repository.get_blocks(&[b3, missing, b1, b2]).unwrap();
        let found: Vec<Option<Hash>> = found.iter().map(|block| block.as_ref().map(|b| b.hash())).collect();
        assert_eq!(found, vec![Some(b3), None, Some(b1), Some(b2)]);
    }

    #[test]
    fn test_put_counts_hits_and_moves_tip() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let repository = DbBlockRepository::new(db.clone(), &StoreConfig::default());
        let mut builder = ChainBuilder::from_genesis();
        repository.initialize(builder.genesis().block()).unwrap();

        let chain = builder.extend(2);
        repository.put_blocks(chain[0].chained_header().hash_height(), &blocks_of(&chain[..1])).unwrap();
        let before = repository.counters();

        // The first block is re-offered together with a new one
        repository.put_blocks(builder.tip().hash_height(), &blocks_of(&chain)).unwrap();
        let delta = repository.counters();
        assert_eq!(delta.block_hits - before.block_hits, 1);
        assert_eq!(delta.blocks_written - before.blocks_written, 1);
        assert_eq!(repository.tip().unwrap(), builder.tip().hash_height());
    }

    #[test]
    fn test_tx_index_lookups_and_delete() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new().enable_tx_index().build();
        let repository = DbBlockRepository::new(db.clone(), &config);
        let mut builder = ChainBuilder::from_genesis().with_txs_per_block(3);
        repository.initialize(builder.genesis().block()).unwrap();
        repository.set_tx_index(true, false).unwrap();

        let chain = builder.extend(2);
        repository.put_blocks(builder.tip().hash_height(), &blocks_of(&chain)).unwrap();

        let tx = chain[1].block().transactions[2].clone();
        assert_eq!(repository.get_block_id_by_transaction_id(tx.id()).unwrap(), Some(chain[1].hash()));
        assert_eq!(repository.get_transaction_by_id(tx.id()).unwrap(), Some(tx.clone()));
        let unknown: TransactionId = 42.into();
        assert_eq!(repository.get_block_ids_by_transaction_ids(&[unknown, tx.id()]).unwrap(), vec![None, Some(chain[1].hash())]);

        repository.delete(chain[0].chained_header().hash_height(), &[chain[1].hash()]).unwrap();
        assert!(!repository.exists(chain[1].hash()).unwrap());
        assert_eq!(repository.get_transaction_by_id(tx.id()).unwrap(), None);
        assert_eq!(repository.tip().unwrap(), chain[0].chained_header().hash_height());
        assert_eq!(repository.counters().tx_entries_deleted, 3);
    }

    #[test]
    fn test_tx_index_switch_requires_reindex() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let repository = DbBlockRepository::new(db.clone(), &StoreConfig::default());
        let mut builder = ChainBuilder::from_genesis().with_txs_per_block(2);
        repository.initialize(builder.genesis().block()).unwrap();

        let chain = builder.extend(4);
        repository.put_blocks(builder.tip().hash_height(), &blocks_of(&chain)).unwrap();
        let tx = chain[2].block().transactions[1].clone();
        assert_eq!(repository.get_transaction_by_id(tx.id()).unwrap(), None);

        let err = repository.set_tx_index(true, false).unwrap_err();
        assert!(matches!(err, BlockStoreError::Config(ConfigError::TxIndexChangeRequiresReindex { stored: false, requested: true })));

        repository.set_tx_index(true, true).unwrap();
        repository.reindex().unwrap();
        assert_eq!(repository.get_transaction_by_id(tx.id()).unwrap(), Some(tx.clone()));
        assert_eq!(repository.counters().tx_entries_written, 8);

        repository.set_tx_index(false, true).unwrap();
        repository.reindex().unwrap();
        assert!(repository.transactions.is_empty());
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let repository = DbBlockRepository::new(db.clone(), &StoreConfig::default());
        let mut builder = ChainBuilder::from_genesis();
        repository.initialize(builder.genesis().block()).unwrap();

        let chain = builder.extend(6);
        let mut shuffled = blocks_of(&chain);
        shuffled.reverse();
        shuffled.swap(1, 4);
        repository.put_blocks(builder.tip().hash_height(), &shuffled).unwrap();
        for item in chain.iter() {
            assert_eq!(repository.get_block(item.hash()).unwrap().map(|b| b.hash()), Some(item.hash()));
        }
        assert_eq!(repository.counters().blocks_written, 6);
    }

    #[test]
    fn test_repeated_transaction_is_indexed_to_the_descendant() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new().enable_tx_index().build();
        let repository = DbBlockRepository::new(db.clone(), &config);
        let builder = ChainBuilder::from_genesis();
        let genesis = builder.genesis().block().clone();
        repository.initialize(&genesis).unwrap();
        repository.set_tx_index(true, false).unwrap();

        let tx = Transaction::new(1, vec![], vec![], 0, vec![7]);
        let parent = Arc::new(Block::from_parts(TEST_BLOCK_VERSION, genesis.hash(), 1, TEST_BITS, 0, vec![tx.clone()]));
        // The descendant sorts before its parent by hash, so byte order alone would pick the parent
        let child = (0..)
            .map(|nonce| Arc::new(Block::from_parts(TEST_BLOCK_VERSION, parent.hash(), 2, TEST_BITS, nonce, vec![tx.clone()])))
            .find(|child| child.hash() < parent.hash())
            .unwrap();

        repository.put_blocks(HashHeightPair::new(child.hash(), 2), &[parent.clone(), child.clone()]).unwrap();
        assert_eq!(repository.get_block_id_by_transaction_id(tx.id()).unwrap(), Some(child.hash()));
        assert_eq!(repository.counters().blocks_written, 2);
    }

    #[test]
    fn test_deletion_waits_for_reads_filling_the_cache() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let repository = DbBlockRepository::new(db.clone(), &StoreConfig::default());
        let mut builder = ChainBuilder::from_genesis();
        repository.initialize(builder.genesis().block()).unwrap();

        let chain = builder.extend(2);
        repository.put_blocks(builder.tip().hash_height(), &blocks_of(&chain)).unwrap();
        let removed = chain[1].hash();
        repository.blocks.evict(&[removed]);

        thread::scope(|scope| {
            // A read in flight: it saw the block in the DB and caches it after the deletion was requested
            let read = repository.deletion_lock.read();
            let deletion = scope.spawn(|| repository.delete(chain[0].chained_header().hash_height(), &[removed]));
            thread::sleep(Duration::from_millis(50));
            assert!(repository.blocks.has_in_db(removed).unwrap());
            assert!(repository.blocks.get_optional(removed).unwrap().is_some());
            drop(read);
            deletion.join().unwrap().unwrap();
        });

        assert!(repository.get_block(removed).unwrap().is_none());
        assert!(!repository.exists(removed).unwrap());
        assert_eq!(repository.tip().unwrap(), chain[0].chained_header().hash_height());
    }
}
