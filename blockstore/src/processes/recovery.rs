//! Startup reconciliation of the persisted store tip with the canonical chain.
//!
//! A crash between a consensus reorg and the matching store flush leaves the repository tip on a
//! branch the chain index no longer knows. Recovery walks that branch back through the stored
//! blocks until it meets the canonical chain and deletes everything it passed.

use crate::{
    errors::{BlockStoreResult, ChainWalk, IntegrityError},
    repository::BlockRepository,
};
use granary_blockstore_core::{chain::ChainedHeader, chain_index::ChainIndex};
use granary_core::{info, warn};
use std::sync::Arc;

/// Returns the canonical header the store tip now points at
pub fn recover_store_tip(repository: &dyn BlockRepository, chain_index: &dyn ChainIndex) -> BlockStoreResult<Arc<ChainedHeader>> {
    let persisted = repository.tip()?;
    if let Some(header) = chain_index.get_header(persisted.hash) {
        return Ok(header);
    }

    warn!("Block store tip {} is not on the canonical chain, recovering", persisted);
    let genesis = chain_index.genesis();
    let mut orphaned = Vec::new();
    let mut current = persisted.hash;
    let recovered = loop {
        if let Some(header) = chain_index.get_header(current) {
            break header;
        }
        orphaned.push(current);
        let block = repository.get_block(current)?.ok_or(IntegrityError::MissingBlock(current, ChainWalk::Recovery))?;
        if block.prev_hash() == genesis.hash() {
            break genesis;
        }
        current = block.prev_hash();
    };

    repository.delete(recovered.hash_height(), &orphaned)?;
    chain_index.set_tip(recovered.clone());
    info!("Block store tip recovered to {} after deleting {} orphaned blocks", recovered, orphaned.len());
    Ok(recovered)
}
