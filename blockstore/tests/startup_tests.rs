mod common;

use common::{Harness, eager_config};
use granary_blockstore::{errors::BlockStoreError, test_helpers::ChainBuilder};
use granary_blockstore_core::{chain_index::ChainIndex, config::StoreConfig, errors::config::ConfigError};
use granary_database::{create_temp_db, prelude::ConnBuilder};

#[test]
fn test_restart_recovers_tip_left_on_abandoned_branch() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let mut main = ChainBuilder::from_genesis();
    let main_blocks = main.extend(5);

    let mut harness = Harness::start(db.clone(), eager_config(), main.tip(), false).unwrap();
    for item in main_blocks.iter().cloned() {
        harness.store.add_to_pending(item).unwrap();
    }
    assert!(harness.wait_for_store_tip(main_blocks[4].chained_header()));
    harness.shutdown().unwrap();
    drop(harness);

    // The node went down after consensus had moved to a fork off height 3
    let mut fork = main.fork_at(3, 4);
    fork.extend(4);
    let mut harness = Harness::start(db.clone(), eager_config(), fork.tip(), false).unwrap();
    assert_eq!(harness.store.store_tip().hash(), main_blocks[2].hash());
    assert_eq!(harness.chain_index.tip().hash(), main_blocks[2].hash());
    assert!(!harness.store.exists(main_blocks[3].hash()).unwrap());
    assert!(!harness.store.exists(main_blocks[4].hash()).unwrap());
    harness.shutdown().unwrap();
}

#[test]
fn test_startup_prunes_below_retention_depth() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let mut builder = ChainBuilder::from_genesis();
    let chain = builder.extend(10);

    let mut harness = Harness::start(db.clone(), eager_config(), builder.tip(), false).unwrap();
    for item in chain.iter().cloned() {
        harness.store.add_to_pending(item).unwrap();
    }
    assert!(harness.wait_for_store_tip(chain[9].chained_header()));
    harness.shutdown().unwrap();
    drop(harness);

    let config = eager_config().to_builder().set_prune_retention_depth(2).build();
    let mut harness = Harness::start(db.clone(), config, builder.tip(), false).unwrap();
    let repository = harness.store.repository();
    assert_eq!(repository.pruned_tip().unwrap().map(|tip| tip.height), Some(8));
    assert!(repository.exists(builder.genesis().hash()).unwrap());
    for item in chain.iter() {
        assert_eq!(repository.exists(item.hash()).unwrap(), item.height() >= 8, "height {}", item.height());
    }
    assert!(harness.store.get_block(chain[4].hash()).unwrap().is_none());
    for item in &chain[8..] {
        let block = harness.store.get_block(item.hash()).unwrap().unwrap();
        assert_eq!(block.hash(), item.hash());
    }
    let found = harness.store.get_blocks(&[chain[4].hash(), chain[9].hash()]).unwrap();
    assert_eq!(found.iter().map(|block| block.as_ref().map(|b| b.hash())).collect::<Vec<_>>(), vec![None, Some(chain[9].hash())]);
    assert_eq!(harness.store.counters().prune_passes, 1);
    harness.shutdown().unwrap();
}

#[test]
fn test_conflicting_configuration_is_rejected() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let builder = ChainBuilder::from_genesis();

    let config = StoreConfig::default().to_builder().enable_tx_index().set_prune_retention_depth(100).build();
    let result = Harness::start(db.clone(), config, builder.tip(), false);
    assert!(matches!(result.err(), Some(BlockStoreError::Config(ConfigError::PruningWithTxIndex))));

    let config = StoreConfig::default().to_builder().set_max_reorg_length(500).set_prune_retention_depth(100).build();
    let result = Harness::start(db.clone(), config, builder.tip(), false);
    assert!(matches!(result.err(), Some(BlockStoreError::Config(ConfigError::RetentionBelowMaxReorg { retention: 100, max_reorg: 500 }))));
}

#[test]
fn test_enabling_tx_index_requires_reindex() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let mut builder = ChainBuilder::from_genesis().with_txs_per_block(2);
    let chain = builder.extend(6);

    let mut harness = Harness::start(db.clone(), eager_config(), builder.tip(), false).unwrap();
    for item in chain.iter().cloned() {
        harness.store.add_to_pending(item).unwrap();
    }
    assert!(harness.wait_for_store_tip(chain[5].chained_header()));
    harness.shutdown().unwrap();
    drop(harness);

    let config = eager_config().to_builder().enable_tx_index().build();
    let result = Harness::start(db.clone(), config.clone(), builder.tip(), false);
    assert!(matches!(
        result.err(),
        Some(BlockStoreError::Config(ConfigError::TxIndexChangeRequiresReindex { stored: false, requested: true }))
    ));

    let config = config.to_builder().set_reindex().build();
    let mut harness = Harness::start(db.clone(), config, builder.tip(), false).unwrap();
    let tx = chain[4].block().transactions[1].clone();
    assert_eq!(harness.store.get_transaction_by_id(tx.id()).unwrap(), Some(tx.clone()));
    assert_eq!(harness.store.get_block_id_for_transaction(tx.id()).unwrap(), Some(chain[4].hash()));
    assert!(harness.store.repository().tx_index().unwrap());
    harness.shutdown().unwrap();
}

#[test]
fn test_store_starts_only_once() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let builder = ChainBuilder::from_genesis();
    let mut harness = Harness::start(db.clone(), eager_config(), builder.tip(), false).unwrap();

    assert!(matches!(harness.store.init(), Err(BlockStoreError::AlreadyStarted)));
    assert!(harness.store.is_accepting());
    harness.shutdown().unwrap();
    assert!(!harness.store.is_accepting());
}
