use granary_blockstore_core::{chain_index::DynChainIndex, chain_state::DynChainState};

/// What the node knows about its sync progress at the moment a flush is considered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub is_initial_block_download: bool,
    pub is_at_best_chain_tip: bool,
    pub consensus_height: u64,
    pub store_height: u64,
}

/// Whether the current batch should be persisted regardless of its size and age.
///
/// Within `flush_distance` of the consensus tip every block is flushed. Further behind, only a
/// node that left initial block download and reports being at its best chain tip flushes eagerly.
pub fn should_flush(snapshot: SyncSnapshot, flush_distance: u64) -> bool {
    let distance = snapshot.consensus_height.saturating_sub(snapshot.store_height);
    if distance <= flush_distance {
        return true;
    }
    !snapshot.is_initial_block_download && snapshot.is_at_best_chain_tip
}

pub struct FlushCondition {
    chain_index: DynChainIndex,
    chain_state: DynChainState,
    flush_distance: u64,
}

impl FlushCondition {
    pub fn new(chain_index: DynChainIndex, chain_state: DynChainState, flush_distance: u64) -> Self {
        Self { chain_index, chain_state, flush_distance }
    }

    pub fn snapshot(&self, store_height: u64) -> SyncSnapshot {
        SyncSnapshot {
            is_initial_block_download: self.chain_state.is_initial_block_download(),
            is_at_best_chain_tip: self.chain_state.is_at_best_chain_tip(),
            consensus_height: self.chain_index.height(),
            store_height,
        }
    }

    pub fn should_flush(&self, store_height: u64) -> bool {
        should_flush(self.snapshot(store_height), self.flush_distance)
    }
}
