use crate::{
    errors::{BlockStoreError, BlockStoreResult},
    pipeline::{
        BlockStoreCounters, BlockStoreCountersSnapshot,
        store_processor::{BlockStoreMessage, BlockStoreProcessor, PendingSet, StoreTipHandle},
    },
    repository::{DbBlockRepository, DynBlockRepository, stats::RepositoryCountersSnapshot},
};
use crossbeam_channel::{Receiver as CrossbeamReceiver, Sender, unbounded};
use granary_blockstore_core::{
    block::Block,
    chain::{ChainedHeader, ChainedHeaderBlock},
    chain_index::DynChainIndex,
    chain_state::DynChainState,
    config::StoreConfig,
    errors::chain::ChainError,
    tx::{Transaction, TransactionId},
};
use granary_core::{error, info};
use granary_database::prelude::DB;
use granary_hashes::Hash;
use parking_lot::{Mutex, RwLock};
use std::{
    sync::{Arc, atomic::Ordering},
    thread::{self, JoinHandle},
};

/// The block store service: accepts validated blocks, answers reads over pending and durable
/// blocks alike, and persists in the background.
pub struct BlockStore {
    // Channels
    sender: Sender<BlockStoreMessage>,
    // Handed to the worker on start
    receiver: Mutex<Option<CrossbeamReceiver<BlockStoreMessage>>>,

    // Processors
    processor: Arc<BlockStoreProcessor>,

    // Stores
    repository: DynBlockRepository,
    pending: Arc<PendingSet>,
    store_tip: StoreTipHandle,

    // Set once exit is signaled or the worker returns. Submissions hold it shared across
    // their send, so no block is queued behind the exit message.
    exiting: Arc<RwLock<bool>>,

    // Counters
    counters: Arc<BlockStoreCounters>,
}

impl BlockStore {
    /// Builds a store backed by `db`. `genesis` must be the block the chain index starts from.
    pub fn new(
        config: StoreConfig,
        db: Arc<DB>,
        genesis: Arc<Block>,
        chain_index: DynChainIndex,
        chain_state: DynChainState,
    ) -> BlockStoreResult<Self> {
        let repository = Arc::new(DbBlockRepository::new(db, &config));
        Self::with_repository(config, repository, genesis, chain_index, chain_state)
    }

    pub fn with_repository(
        config: StoreConfig,
        repository: DynBlockRepository,
        genesis: Arc<Block>,
        chain_index: DynChainIndex,
        chain_state: DynChainState,
    ) -> BlockStoreResult<Self> {
        let genesis_header = chain_index.genesis();
        if genesis.hash() != genesis_header.hash() {
            return Err(ChainError::HeaderBlockMismatch { block: genesis.hash(), header: genesis_header.hash() }.into());
        }

        let (sender, receiver) = unbounded();
        let pending = Arc::new(PendingSet::default());
        let counters = Arc::new(BlockStoreCounters::default());
        let processor = Arc::new(BlockStoreProcessor::new(
            Arc::new(config),
            genesis,
            chain_index,
            chain_state,
            repository.clone(),
            pending.clone(),
            counters.clone(),
        ));

        Ok(Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            store_tip: processor.store_tip_handle(),
            processor,
            repository,
            pending,
            exiting: Arc::new(RwLock::new(false)),
            counters,
        })
    }

    /// Initializes the repository, recovers the store tip, prunes if configured and spawns the
    /// batcher. The worker's result is surfaced through the returned handle.
    pub fn init(&self) -> BlockStoreResult<JoinHandle<BlockStoreResult<()>>> {
        let mut slot = self.receiver.lock();
        if slot.is_none() {
            return Err(BlockStoreError::AlreadyStarted);
        }
        self.processor.init()?;
        let receiver = slot.take().ok_or(BlockStoreError::AlreadyStarted)?;
        let processor = self.processor.clone();
        let exiting = self.exiting.clone();
        thread::Builder::new()
            .name("block-store".to_string())
            .spawn(move || {
                let result = processor.worker(receiver);
                *exiting.write() = true;
                result
            })
            .map_err(BlockStoreError::WorkerSpawn)
    }

    /// Queues a validated block for persistence. Never blocks; the block is readable right away.
    pub fn add_to_pending(&self, item: ChainedHeaderBlock) -> BlockStoreResult<()> {
        let exiting = self.exiting.read();
        if *exiting {
            return Err(BlockStoreError::ShuttingDown);
        }
        let hash = item.hash();
        self.pending.insert(item.clone());
        if self.sender.send(BlockStoreMessage::Block(item)).is_err() {
            self.pending.remove_many(std::iter::once(hash));
            return Err(BlockStoreError::ShuttingDown);
        }
        self.counters.blocks_submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn get_block(&self, hash: Hash) -> BlockStoreResult<Option<Arc<Block>>> {
        if let Some(block) = self.pending.get_block(hash) {
            return Ok(Some(block));
        }
        self.repository.get_block(hash)
    }

    /// Returns one entry per requested hash, in request order
    pub fn get_blocks(&self, hashes: &[Hash]) -> BlockStoreResult<Vec<Option<Arc<Block>>>> {
        let mut found: Vec<Option<Arc<Block>>> = hashes.iter().map(|hash| self.pending.get_block(*hash)).collect();
        let (positions, missing): (Vec<usize>, Vec<Hash>) = found
            .iter()
            .zip(hashes.iter())
            .enumerate()
            .filter(|(_, (block, _))| block.is_none())
            .map(|(position, (_, hash))| (position, *hash))
            .unzip();
        if !missing.is_empty() {
            for (position, block) in positions.into_iter().zip(self.repository.get_blocks(&missing)?) {
                found[position] = block;
            }
        }
        Ok(found)
    }

    pub fn exists(&self, hash: Hash) -> BlockStoreResult<bool> {
        Ok(self.pending.contains(hash) || self.repository.exists(hash)?)
    }

    pub fn get_transaction_by_id(&self, id: TransactionId) -> BlockStoreResult<Option<Transaction>> {
        if let Some(tx) = self.pending.get_transaction(id) {
            return Ok(Some(tx));
        }
        self.repository.get_transaction_by_id(id)
    }

    pub fn get_transactions_by_ids(&self, ids: &[TransactionId]) -> BlockStoreResult<Vec<Option<Transaction>>> {
        ids.iter().map(|id| self.get_transaction_by_id(*id)).collect()
    }

    pub fn get_block_id_for_transaction(&self, id: TransactionId) -> BlockStoreResult<Option<Hash>> {
        if let Some(hash) = self.pending.get_block_id_for_transaction(id) {
            return Ok(Some(hash));
        }
        self.repository.get_block_id_by_transaction_id(id)
    }

    pub fn get_block_ids_for_transactions(&self, ids: &[TransactionId]) -> BlockStoreResult<Vec<Option<Hash>>> {
        ids.iter().map(|id| self.get_block_id_for_transaction(*id)).collect()
    }

    /// The durable tip: every block up to it is persisted
    pub fn store_tip(&self) -> Arc<ChainedHeader> {
        self.store_tip.get()
    }

    pub fn store_tip_handle(&self) -> StoreTipHandle {
        self.store_tip.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn repository(&self) -> DynBlockRepository {
        self.repository.clone()
    }

    pub fn counters(&self) -> BlockStoreCountersSnapshot {
        self.counters.snapshot()
    }

    pub fn repository_counters(&self) -> Option<RepositoryCountersSnapshot> {
        self.repository.stats().map(|stats| stats.counters())
    }

    /// One-line summary for the node's periodic stats output
    pub fn stats_line(&self) -> String {
        let tip = self.store_tip();
        format!("BlockStore.Height: {} BlockStore.Hash: {} Pending: {}", tip.height(), tip.hash(), self.pending_count())
    }

    /// Asks the worker to flush what it holds and exit. Further blocks are refused.
    pub fn signal_exit(&self) {
        let mut exiting = self.exiting.write();
        if !*exiting {
            *exiting = true;
            info!("Block store is shutting down");
            // A closed channel means the worker is gone already
            let _ = self.sender.send(BlockStoreMessage::Exit);
        }
    }

    /// Whether blocks are still accepted: false once exit was signaled or the worker stopped
    pub fn is_accepting(&self) -> bool {
        !*self.exiting.read()
    }

    /// Signals exit and waits for the worker, returning its final result
    pub fn shutdown(&self, worker: JoinHandle<BlockStoreResult<()>>) -> BlockStoreResult<()> {
        self.signal_exit();
        match worker.join() {
            Ok(result) => result,
            Err(_) => {
                error!("The block store worker panicked");
                Err(BlockStoreError::WorkerPanicked)
            }
        }
    }
}
