mod common;

use common::{Harness, WAIT, eager_config, lazy_config};
use granary_blockstore::{
    errors::{BlockStoreError, ChainWalk, IntegrityError},
    test_helpers::{ChainBuilder, wait_until},
};
use granary_database::{create_temp_db, prelude::ConnBuilder};

#[test]
fn test_stored_blocks_of_abandoned_branch_are_deleted() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let mut main = ChainBuilder::from_genesis().with_txs_per_block(2);
    let main_blocks = main.extend(5);
    let mut harness = Harness::start(db.clone(), eager_config(), main.tip(), false).unwrap();

    for item in main_blocks.iter().cloned() {
        harness.store.add_to_pending(item).unwrap();
    }
    assert!(harness.wait_for_store_tip(main_blocks[4].chained_header()));

    // Consensus switches to a longer fork off height 3
    let mut fork = main.fork_at(3, 7);
    let fork_blocks = fork.extend(3);
    harness.set_canonical_tip(fork.tip());
    for item in fork_blocks.iter().cloned() {
        harness.store.add_to_pending(item).unwrap();
    }
    assert!(harness.wait_for_store_tip(fork_blocks[2].chained_header()));

    let repository = harness.store.repository();
    assert_eq!(repository.tip().unwrap(), fork.tip().hash_height());
    assert!(repository.exists(main_blocks[2].hash()).unwrap());
    assert!(!repository.exists(main_blocks[3].hash()).unwrap());
    assert!(!repository.exists(main_blocks[4].hash()).unwrap());
    for item in fork_blocks.iter() {
        assert!(repository.exists(item.hash()).unwrap());
    }
    assert_eq!(harness.store.counters().reorg_deleted, 2);
    harness.shutdown().unwrap();
}

#[test]
fn test_replaced_sibling_never_reaches_the_repository() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let mut main = ChainBuilder::from_genesis();
    let main_blocks = main.extend(2);
    let mut fork = main.fork_at(1, 5);
    let fork_blocks = fork.extend(40);
    let mut harness = Harness::start(db.clone(), lazy_config(), main.tip(), true).unwrap();

    harness.store.add_to_pending(main_blocks[0].clone()).unwrap();
    harness.store.add_to_pending(main_blocks[1].clone()).unwrap();
    harness.set_canonical_tip(fork.tip());
    harness.store.add_to_pending(fork_blocks[0].clone()).unwrap();
    assert_eq!(harness.store.pending_count(), 3);

    harness.shutdown().unwrap();
    let repository = harness.store.repository();
    assert!(repository.exists(main_blocks[0].hash()).unwrap());
    assert!(repository.exists(fork_blocks[0].hash()).unwrap());
    assert!(!repository.exists(main_blocks[1].hash()).unwrap());
    assert_eq!(repository.tip().unwrap(), fork_blocks[0].chained_header().hash_height());

    let counters = harness.store.counters();
    assert_eq!(counters.blocks_dropped, 1);
    assert_eq!(counters.reorg_deleted, 0);
    assert_eq!(harness.store.pending_count(), 0);
}

#[test]
fn test_redelivered_durable_block_is_not_rewritten() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let mut main = ChainBuilder::from_genesis();
    let main_blocks = main.extend(3);
    let mut harness = Harness::start(db.clone(), eager_config(), main.tip(), false).unwrap();

    for item in main_blocks.iter().cloned() {
        harness.store.add_to_pending(item).unwrap();
    }
    assert!(harness.wait_for_store_tip(main_blocks[2].chained_header()));

    harness.store.add_to_pending(main_blocks[1].clone()).unwrap();
    harness.shutdown().unwrap();
    assert_eq!(harness.store.store_tip().hash(), main_blocks[2].hash());
    assert_eq!(harness.store.counters().reorg_deleted, 0);
    assert_eq!(harness.store.repository_counters().unwrap().blocks_written, 3);
}

#[test]
fn test_unreachable_fork_base_stops_the_worker() {
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let mut main = ChainBuilder::from_genesis();
    let main_blocks = main.extend(3);
    let mut harness = Harness::start(db.clone(), eager_config(), main.tip(), false).unwrap();

    harness.store.add_to_pending(main_blocks[0].clone()).unwrap();
    assert!(harness.wait_for_store_tip(main_blocks[0].chained_header()));

    // A block whose parent was never handed to the store
    let mut fork = main.fork_at(1, 9);
    let fork_blocks = fork.extend(2);
    harness.store.add_to_pending(fork_blocks[1].clone()).unwrap();

    // The dead worker refuses further blocks instead of queueing them for nobody
    assert!(wait_until(WAIT, || !harness.store.is_accepting()));
    let err = harness.store.add_to_pending(main_blocks[1].clone()).unwrap_err();
    assert!(matches!(err, BlockStoreError::ShuttingDown));
    assert!(!harness.store.exists(main_blocks[1].hash()).unwrap());

    let err = harness.shutdown().unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        BlockStoreError::Integrity(IntegrityError::UnreachableAncestor { target, walk: ChainWalk::ReorgCorrection, .. })
            if target == fork_blocks[0].hash()
    ));
    assert_eq!(harness.store.store_tip().hash(), main_blocks[0].hash());
}
