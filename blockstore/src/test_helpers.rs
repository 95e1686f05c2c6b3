//! Deterministic chains of blocks for tests of the block store and its collaborators.

use granary_blockstore_core::{
    block::Block,
    chain::{ChainedHeader, ChainedHeaderBlock},
    tx::{Transaction, TransactionInput, TransactionOutpoint, TransactionOutput},
};
use granary_hashes::{Hash, ZERO_HASH};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

pub const TEST_BLOCK_VERSION: u16 = 1;
pub const TEST_BITS: u32 = 0x207fffff;

fn coinbase(height: u64, salt: u64) -> Transaction {
    let payload = [height.to_le_bytes(), salt.to_le_bytes()].concat();
    Transaction::new(1, vec![], vec![TransactionOutput::new(50, vec![0x51])], 0, payload)
}

fn spend(height: u64, salt: u64, index: usize) -> Transaction {
    let outpoint = TransactionOutpoint::new(Hash::from_u64_word(height ^ (salt << 32)), index as u32);
    let input = TransactionInput::new(outpoint, salt.to_le_bytes().to_vec(), u64::MAX);
    Transaction::new(1, vec![input], vec![TransactionOutput::new(index as u64 + 1, vec![0x51])], 0, height.to_le_bytes().to_vec())
}

/// Builds a block on top of `parent`. `salt` separates sibling blocks of competing forks.
pub fn build_block(parent: &Arc<ChainedHeader>, salt: u64, txs_per_block: usize) -> ChainedHeaderBlock {
    let height = parent.height() + 1;
    let transactions =
        std::iter::once(coinbase(height, salt)).chain((1..txs_per_block).map(|index| spend(height, salt, index))).collect();
    let block = Block::from_parts(TEST_BLOCK_VERSION, parent.hash(), height, TEST_BITS, salt, transactions);
    let header = ChainedHeader::new(block.header.clone(), parent.clone()).expect("the block is built on its parent");
    ChainedHeaderBlock::new(Arc::new(block), header).expect("the header is taken from the block")
}

/// The genesis block shared by every test chain
pub fn genesis() -> ChainedHeaderBlock {
    let block = Block::from_parts(TEST_BLOCK_VERSION, ZERO_HASH, 0, TEST_BITS, 0, vec![coinbase(0, 0)]);
    let header = ChainedHeader::genesis(block.header.clone());
    ChainedHeaderBlock::new(Arc::new(block), header).expect("the header is taken from the block")
}

/// Grows a chain block by block. Builders sharing a tip but using different salts produce forks.
#[derive(Clone)]
pub struct ChainBuilder {
    genesis: ChainedHeaderBlock,
    tip: Arc<ChainedHeader>,
    salt: u64,
    txs_per_block: usize,
}

impl ChainBuilder {
    pub fn from_genesis() -> Self {
        let genesis = genesis();
        Self { tip: genesis.chained_header().clone(), genesis, salt: 0, txs_per_block: 1 }
    }

    pub fn with_salt(mut self, salt: u64) -> Self {
        self.salt = salt;
        self
    }

    pub fn with_txs_per_block(mut self, txs_per_block: usize) -> Self {
        self.txs_per_block = txs_per_block.max(1);
        self
    }

    pub fn genesis(&self) -> &ChainedHeaderBlock {
        &self.genesis
    }

    pub fn tip(&self) -> Arc<ChainedHeader> {
        self.tip.clone()
    }

    pub fn next_block(&mut self) -> ChainedHeaderBlock {
        let item = build_block(&self.tip, self.salt, self.txs_per_block);
        self.tip = item.chained_header().clone();
        item
    }

    pub fn extend(&mut self, count: usize) -> Vec<ChainedHeaderBlock> {
        (0..count).map(|_| self.next_block()).collect()
    }

    /// A builder continuing from the ancestor at `height`, with its own salt
    pub fn fork_at(&self, height: u64, salt: u64) -> Self {
        let tip = self.tip.get_ancestor(height).expect("fork height is below the tip");
        Self { genesis: self.genesis.clone(), tip, salt, txs_per_block: self.txs_per_block }
    }
}

/// Polls `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
