use crate::{
    errors::{BlockStoreResult, ChainWalk, IntegrityError},
    repository::DynBlockRepository,
};
use granary_blockstore_core::chain::{ChainedHeader, HashHeightPair};
use granary_core::{debug, info};
use std::sync::Arc;

/// Deletes blocks deeper than the retention depth below the repository tip. Genesis is never pruned.
pub struct BlockStorePruner {
    repository: DynBlockRepository,
    retention_depth: u64,
}

impl BlockStorePruner {
    pub fn new(repository: DynBlockRepository, retention_depth: u64) -> Self {
        Self { repository, retention_depth }
    }

    pub fn retention_depth(&self) -> u64 {
        self.retention_depth
    }

    /// Prunes below `repository tip - retention depth`, walking `canonical_tip` to find the blocks
    /// to delete. Returns the new pruned tip, or `None` when there was nothing to prune.
    pub fn prune_database(&self, canonical_tip: &Arc<ChainedHeader>, during_startup: bool) -> BlockStoreResult<Option<HashHeightPair>> {
        let repository_tip = self.repository.tip()?;
        let pruned_tip = self.repository.pruned_tip()?.unwrap_or_default();
        if repository_tip.height.saturating_sub(pruned_tip.height) <= self.retention_depth {
            debug!("Nothing to prune: repository tip {} is within {} blocks of pruned tip {}", repository_tip, self.retention_depth, pruned_tip);
            return Ok(None);
        }

        let boundary_height = repository_tip.height - self.retention_depth;
        let boundary = canonical_tip
            .get_ancestor(boundary_height)
            .ok_or(IntegrityError::MissingHeight(boundary_height, ChainWalk::Pruning))?;

        let floor = pruned_tip.height.max(1);
        let mut doomed = Vec::with_capacity(boundary_height.saturating_sub(floor) as usize);
        let mut current = boundary.previous().cloned();
        while let Some(header) = current {
            if header.height() < floor {
                break;
            }
            doomed.push(header.hash());
            current = header.previous().cloned();
        }

        if during_startup {
            info!("Pruning {} blocks below height {} before starting the block store", doomed.len(), boundary_height);
        } else {
            debug!("Pruning {} blocks below height {}", doomed.len(), boundary_height);
        }
        self.repository.delete_blocks(&doomed)?;
        self.repository.compact();

        let new_pruned_tip = boundary.hash_height();
        self.repository.set_pruned_tip(new_pruned_tip)?;
        info!("Block store pruned up to {}", new_pruned_tip);
        Ok(Some(new_pruned_tip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{repository::DbBlockRepository, test_helpers::ChainBuilder};
    use granary_blockstore_core::{block::Block, config::StoreConfig};
    use granary_database::{create_temp_db, prelude::ConnBuilder};

    #[test]
    fn test_prune_keeps_retention_window_and_genesis() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let repository: DynBlockRepository = Arc::new(DbBlockRepository::new(db.clone(), &StoreConfig::default()));
        let mut builder = ChainBuilder::from_genesis();
        repository.initialize(builder.genesis().block()).unwrap();
        let chain = builder.extend(10);
        let blocks: Vec<Arc<Block>> = chain.iter().map(|item| item.block().clone()).collect();
        repository.put_blocks(builder.tip().hash_height(), &blocks).unwrap();

        let pruner = BlockStorePruner::new(repository.clone(), 2);
        let pruned = pruner.prune_database(&builder.tip(), true).unwrap().unwrap();
        assert_eq!(pruned.height, 8);
        assert_eq!(repository.pruned_tip().unwrap(), Some(pruned));

        assert!(repository.exists(builder.genesis().hash()).unwrap());
        for item in chain.iter() {
            assert_eq!(repository.exists(item.hash()).unwrap(), item.height() >= 8, "height {}", item.height());
        }

        // A second pass without new blocks is a no-op
        assert_eq!(pruner.prune_database(&builder.tip(), false).unwrap(), None);
    }

    #[test]
    fn test_prune_resumes_from_previous_boundary() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let repository: DynBlockRepository = Arc::new(DbBlockRepository::new(db.clone(), &StoreConfig::default()));
        let mut builder = ChainBuilder::from_genesis();
        repository.initialize(builder.genesis().block()).unwrap();
        let pruner = BlockStorePruner::new(repository.clone(), 3);

        let first = builder.extend(5);
        let blocks: Vec<Arc<Block>> = first.iter().map(|item| item.block().clone()).collect();
        repository.put_blocks(builder.tip().hash_height(), &blocks).unwrap();
        assert_eq!(pruner.prune_database(&builder.tip(), false).unwrap().map(|p| p.height), Some(2));

        let second = builder.extend(4);
        let blocks: Vec<Arc<Block>> = second.iter().map(|item| item.block().clone()).collect();
        repository.put_blocks(builder.tip().hash_height(), &blocks).unwrap();
        assert_eq!(pruner.prune_database(&builder.tip(), false).unwrap().map(|p| p.height), Some(6));

        let surviving: Vec<u64> = first.iter().chain(second.iter()).filter(|item| repository.exists(item.hash()).unwrap()).map(|item| item.height()).collect();
        assert_eq!(surviving, vec![6, 7, 8, 9]);
    }
}
