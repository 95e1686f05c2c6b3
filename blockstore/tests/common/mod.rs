#![allow(dead_code)]

use granary_blockstore::{
    BlockStore,
    errors::BlockStoreResult,
    repository::{DbBlockRepository, DynBlockRepository},
    test_helpers::{ChainBuilder, wait_until},
};
use granary_blockstore_core::{
    chain::ChainedHeader,
    chain_index::{ChainIndex, MemoryChainIndex},
    chain_state::ChainStateFlags,
    config::StoreConfig,
};
use granary_database::prelude::DB;
use std::{sync::Arc, thread::JoinHandle, time::Duration};

pub const WAIT: Duration = Duration::from_secs(10);

/// A running block store over a shared DB, with the consensus side simulated in memory
pub struct Harness {
    pub store: BlockStore,
    pub chain_index: Arc<MemoryChainIndex>,
    pub chain_state: Arc<ChainStateFlags>,
    worker: Option<JoinHandle<BlockStoreResult<()>>>,
}

impl Harness {
    /// Starts a store whose canonical chain ends at `canonical_tip`
    pub fn start(db: Arc<DB>, config: StoreConfig, canonical_tip: Arc<ChainedHeader>, ibd: bool) -> BlockStoreResult<Self> {
        let repository = Arc::new(DbBlockRepository::new(db, &config));
        Self::start_with_repository(repository, config, canonical_tip, ibd)
    }

    pub fn start_with_repository(
        repository: DynBlockRepository,
        config: StoreConfig,
        canonical_tip: Arc<ChainedHeader>,
        ibd: bool,
    ) -> BlockStoreResult<Self> {
        granary_core::log::try_init_logger("info");
        let builder = ChainBuilder::from_genesis();
        let chain_index = Arc::new(MemoryChainIndex::with_tip(canonical_tip));
        let chain_state = Arc::new(ChainStateFlags::new(!ibd, ibd));
        let store =
            BlockStore::with_repository(config, repository, builder.genesis().block().clone(), chain_index.clone(), chain_state.clone())?;
        let worker = store.init()?;
        Ok(Self { store, chain_index, chain_state, worker: Some(worker) })
    }

    /// Moves the consensus tip, as a reorg or a new best block would
    pub fn set_canonical_tip(&self, tip: Arc<ChainedHeader>) {
        self.chain_index.set_tip(tip);
    }

    pub fn wait_for_store_tip(&self, expected: &Arc<ChainedHeader>) -> bool {
        wait_until(WAIT, || self.store.store_tip().hash() == expected.hash())
    }

    pub fn shutdown(&mut self) -> BlockStoreResult<()> {
        match self.worker.take() {
            Some(worker) => self.store.shutdown(worker),
            None => Ok(()),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.store.shutdown(worker);
        }
    }
}

/// Flushes on every block regardless of sync state
pub fn eager_config() -> StoreConfig {
    StoreConfig::default().to_builder().set_batch_threshold_bytes(1).build()
}

/// Never flushes on its own within a test's lifetime
pub fn lazy_config() -> StoreConfig {
    StoreConfig::default()
        .to_builder()
        .set_flush_distance(0)
        .set_batch_max_save_interval(Duration::from_secs(600))
        .build()
}
