use super::{Batch, PendingSet, StoreTipCell, StoreTipHandle};
use crate::{
    errors::{BlockStoreError, BlockStoreResult, ChainWalk, IntegrityError},
    pipeline::BlockStoreCounters,
    processes::{flush_condition::FlushCondition, pruning::BlockStorePruner, recovery::recover_store_tip},
    repository::DynBlockRepository,
};
use crossbeam_channel::{Receiver as CrossbeamReceiver, after, never, select, tick};
use granary_blockstore_core::{
    block::Block,
    chain::{ChainedHeader, ChainedHeaderBlock},
    chain_index::DynChainIndex,
    chain_state::DynChainState,
    config::StoreConfig,
};
use granary_core::{debug, error, info, warn};
use granary_hashes::Hash;
use itertools::Itertools;
use std::{
    sync::{Arc, atomic::Ordering},
    thread,
    time::{Duration, Instant},
};

const FINAL_FLUSH_ATTEMPTS: usize = 3;
const FINAL_FLUSH_RETRY_DELAY: Duration = Duration::from_millis(200);

pub enum BlockStoreMessage {
    Exit,
    Block(ChainedHeaderBlock),
}

enum WorkerEvent {
    Block(ChainedHeaderBlock),
    SaveTimer,
    Prune,
    Stats,
    Exit,
}

/// The batcher. Owns the store tip and is the only writer of the repository once started.
pub struct BlockStoreProcessor {
    // Config
    config: Arc<StoreConfig>,
    genesis: Arc<Block>,

    // Collaborators
    chain_index: DynChainIndex,
    chain_state: DynChainState,

    // Stores
    repository: DynBlockRepository,

    // Shared state
    pending: Arc<PendingSet>,
    store_tip: StoreTipCell,

    // Managers
    flush_condition: FlushCondition,
    pruner: Option<BlockStorePruner>,

    // Counters
    counters: Arc<BlockStoreCounters>,
}

impl BlockStoreProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<StoreConfig>,
        genesis: Arc<Block>,
        chain_index: DynChainIndex,
        chain_state: DynChainState,
        repository: DynBlockRepository,
        pending: Arc<PendingSet>,
        counters: Arc<BlockStoreCounters>,
    ) -> Self {
        let flush_condition = FlushCondition::new(chain_index.clone(), chain_state.clone(), config.flush_distance);
        let pruner =
            config.is_pruning_enabled().then(|| BlockStorePruner::new(repository.clone(), config.prune_retention_depth));
        Self {
            store_tip: StoreTipCell::new(chain_index.genesis()),
            config,
            genesis,
            chain_index,
            chain_state,
            repository,
            pending,
            flush_condition,
            pruner,
            counters,
        }
    }

    pub fn store_tip_handle(&self) -> StoreTipHandle {
        self.store_tip.handle()
    }

    /// Prepares the repository and the store tip. Must complete before [`Self::worker`] starts.
    pub fn init(&self) -> BlockStoreResult<()> {
        self.config.validate()?;
        self.repository.initialize(&self.genesis)?;
        self.repository.set_tx_index(self.config.tx_index, self.config.reindex)?;
        if self.config.reindex {
            self.repository.reindex()?;
        }

        let tip = recover_store_tip(self.repository.as_ref(), self.chain_index.as_ref())?;
        self.publish_store_tip(tip.clone());

        if let Some(pruner) = self.pruner.as_ref() {
            pruner.prune_database(&tip, true)?;
            self.counters.prune_passes.fetch_add(1, Ordering::Relaxed);
        }
        info!("Block store initialized at {}", tip);
        Ok(())
    }

    /// Runs the batcher until exit. `receiver` is dropped on return, fatal or not, so later sends fail.
    pub fn worker(self: &Arc<Self>, receiver: CrossbeamReceiver<BlockStoreMessage>) -> BlockStoreResult<()> {
        let mut batch = Batch::default();
        let mut save_timer = never();
        let prune_ticker = if self.pruner.is_some() { tick(self.config.prune_interval) } else { never() };
        let stats_ticker = tick(self.config.stats_interval);

        loop {
            let event = select! {
                recv(receiver) -> msg => match msg {
                    Ok(BlockStoreMessage::Block(item)) => WorkerEvent::Block(item),
                    Ok(BlockStoreMessage::Exit) | Err(_) => WorkerEvent::Exit,
                },
                recv(save_timer) -> _ => WorkerEvent::SaveTimer,
                recv(prune_ticker) -> _ => WorkerEvent::Prune,
                recv(stats_ticker) -> _ => WorkerEvent::Stats,
            };

            match event {
                WorkerEvent::Block(item) => {
                    if batch.is_empty() {
                        save_timer = after(self.config.batch_max_save_interval);
                    }
                    batch.push(item);
                    let store_height = self.store_tip.get().height();
                    if batch.bytes() >= self.config.batch_threshold_bytes || self.flush_condition.should_flush(store_height) {
                        save_timer = self.try_flush(&mut batch)?;
                    }
                }
                WorkerEvent::SaveTimer => save_timer = self.try_flush(&mut batch)?,
                WorkerEvent::Prune => {
                    if let Err(err) = self.prune() {
                        self.tolerate("Pruning", err)?;
                    }
                }
                WorkerEvent::Stats => self.log_stats(),
                WorkerEvent::Exit => {
                    for msg in receiver.try_iter() {
                        if let BlockStoreMessage::Block(item) = msg {
                            batch.push(item);
                        }
                    }
                    self.final_flush(&mut batch)?;
                    break;
                }
            }
        }

        info!("Block store worker exited at {}", self.store_tip.get());
        Ok(())
    }

    /// Flushes and returns the save timer to arm next: none on success, a retry on a transient failure
    fn try_flush(&self, batch: &mut Batch) -> BlockStoreResult<CrossbeamReceiver<Instant>> {
        match self.flush(batch) {
            Ok(()) => Ok(never()),
            Err(err) => {
                self.counters.failed_flushes.fetch_add(1, Ordering::Relaxed);
                self.tolerate("Flush", err)?;
                Ok(after(self.config.batch_max_save_interval))
            }
        }
    }

    /// Logs a failure and swallows it unless it is fatal
    fn tolerate(&self, what: &str, err: BlockStoreError) -> BlockStoreResult<()> {
        if err.is_fatal() {
            error!("{} failed fatally: {}", what, err);
            return Err(err);
        }
        warn!("{} failed, will retry: {}", what, err);
        Ok(())
    }

    fn final_flush(&self, batch: &mut Batch) -> BlockStoreResult<()> {
        let mut attempt = 1;
        loop {
            match self.flush(batch) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_fatal() || attempt >= FINAL_FLUSH_ATTEMPTS => {
                    self.counters.failed_flushes.fetch_add(1, Ordering::Relaxed);
                    error!("Final flush of {} pending blocks failed: {}", batch.len(), err);
                    return Err(err);
                }
                Err(err) => {
                    self.counters.failed_flushes.fetch_add(1, Ordering::Relaxed);
                    warn!("Final flush attempt {} failed: {}", attempt, err);
                    attempt += 1;
                    thread::sleep(FINAL_FLUSH_RETRY_DELAY);
                }
            }
        }
    }

    /// Persists the batch. On error the batch is left untouched so the next attempt starts over.
    fn flush(&self, batch: &mut Batch) -> BlockStoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let clean = batch.clean();
        let dropped = batch.len() - clean.len();
        if dropped > 0 {
            let kept = clean.iter().map(|item| item.hash()).collect::<Vec<_>>();
            debug!(
                "Dropping {} reorged blocks from the batch: {}",
                dropped,
                batch.items().iter().map(|item| item.hash()).filter(|hash| !kept.contains(hash)).join(", ")
            );
        }

        // Re-delivered blocks that are already part of the durable chain need no write
        let store_tip = self.store_tip.get();
        let durable = clean
            .iter()
            .take_while(|item| store_tip.get_ancestor(item.height()).is_some_and(|ancestor| ancestor.hash() == item.hash()))
            .count();
        let fresh = &clean[durable..];

        if let (Some(oldest), Some(newest)) = (fresh.first(), fresh.last()) {
            if store_tip.hash() != oldest.prev_hash() {
                self.correct_reorg(&store_tip, oldest.prev_hash())?;
            }
            let new_tip = newest.chained_header().clone();
            let blocks: Vec<Arc<Block>> = fresh.iter().map(|item| item.block().clone()).collect();
            self.repository.put_blocks(new_tip.hash_height(), &blocks)?;
            self.publish_store_tip(new_tip);
        }

        // Dropped entries leave the pending set as well; they will never be persisted
        self.pending.remove_many(batch.items().iter().map(|item| item.hash()));

        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        self.counters.blocks_persisted.fetch_add(fresh.len() as u64, Ordering::Relaxed);
        self.counters.blocks_dropped.fetch_add(dropped as u64, Ordering::Relaxed);
        self.counters.bytes_flushed.fetch_add(batch.bytes(), Ordering::Relaxed);
        debug!("Flushed {} blocks ({} bytes), store tip {}", fresh.len(), batch.bytes(), self.store_tip.get());
        batch.clear();
        Ok(())
    }

    /// Deletes the stored blocks above `base` so the next batch extends the store tip
    fn correct_reorg(&self, store_tip: &Arc<ChainedHeader>, base: Hash) -> BlockStoreResult<()> {
        let mut reorged = Vec::new();
        let mut fork_point = store_tip.clone();
        while fork_point.hash() != base {
            reorged.push(fork_point.hash());
            fork_point = fork_point.previous().cloned().ok_or(IntegrityError::UnreachableAncestor {
                from: store_tip.hash(),
                target: base,
                walk: ChainWalk::ReorgCorrection,
            })?;
        }

        info!("Reorg: deleting {} stored blocks above fork point {}", reorged.len(), fork_point);
        self.repository.delete(fork_point.hash_height(), &reorged)?;
        self.counters.reorg_deleted.fetch_add(reorged.len() as u64, Ordering::Relaxed);
        self.publish_store_tip(fork_point);
        Ok(())
    }

    fn prune(&self) -> BlockStoreResult<()> {
        if let Some(pruner) = self.pruner.as_ref() {
            pruner.prune_database(&self.store_tip.get(), false)?;
            self.counters.prune_passes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn publish_store_tip(&self, tip: Arc<ChainedHeader>) {
        self.store_tip.set(tip.clone());
        self.chain_state.set_block_store_tip(tip);
    }

    fn log_stats(&self) {
        let tip = self.store_tip.get();
        info!("BlockStore.Height: {} BlockStore.Hash: {} Pending: {}", tip.height(), tip.hash(), self.pending.len());
        let snapshot = self.counters.snapshot();
        debug!(
            "Block store: {} flushes, {} blocks persisted, {} dropped from batches, {} deleted by reorgs",
            snapshot.flushes, snapshot.blocks_persisted, snapshot.blocks_dropped, snapshot.reorg_deleted
        );
        if let Some(stats) = self.repository.stats() {
            let counters = stats.counters();
            let cache = stats.block_cache();
            debug!(
                "Block repository: {} blocks written, {} already present, {} deleted, block cache hit ratio {:.2}",
                counters.blocks_written,
                counters.block_hits,
                counters.blocks_deleted,
                cache.hit_ratio()
            );
        }
    }
}
