use std::sync::Arc;

use crate::{ByteSize, header::Header, merkle::calc_merkle_root, tx::Transaction};
use granary_hashes::Hash;
use granary_utils::mem_size::MemSizeEstimator;
use serde::{Deserialize, Serialize};
use std::mem::size_of;

/// A block: a header plus an ordered list of transactions. Identity is the header hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Arc<Vec<Transaction>>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self { header, transactions: Arc::new(transactions) }
    }

    pub fn from_header(header: Header) -> Self {
        Self { header, transactions: Arc::new(Vec::new()) }
    }

    /// Builds a block on top of `hash_prev_block` with the merkle root of `transactions`
    pub fn from_parts(version: u16, hash_prev_block: Hash, timestamp: u64, bits: u32, nonce: u64, transactions: Vec<Transaction>) -> Self {
        let merkle_root = calc_merkle_root(transactions.iter().map(|tx| tx.id()));
        Self::new(Header::new_finalized(version, hash_prev_block, merkle_root, timestamp, bits, nonce), transactions)
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    pub fn prev_hash(&self) -> Hash {
        self.header.hash_prev_block
    }

    pub fn is_header_only(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Size of the block in its stored (bincode) form
    pub fn serialized_size(&self) -> ByteSize {
        // Serializing plain owned data into a size counter cannot fail
        bincode::serialized_size(self).unwrap_or_default()
    }
}

impl MemSizeEstimator for Block {
    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>() + self.header.estimate_mem_bytes() + self.transactions.iter().map(|tx| tx.estimate_mem_bytes()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::TransactionOutput;

    #[test]
    fn test_block_identity_and_size() {
        let txs = vec![
            Transaction::new(0, vec![], vec![TransactionOutput::new(50, vec![0xaa; 25])], 0, vec![1]),
            Transaction::new(0, vec![], vec![TransactionOutput::new(10, vec![0xbb; 25])], 0, vec![2]),
        ];
        let block = Block::from_parts(1, 5.into(), 100, 0x207fffff, 0, txs.clone());
        assert_eq!(block.prev_hash(), 5.into());
        assert_eq!(block.header.hash_merkle_root, calc_merkle_root(txs.iter().map(|tx| tx.id())));

        let bytes = bincode::serialize(&block).unwrap();
        assert_eq!(block.serialized_size(), bytes.len() as u64);
        let decoded: Block = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.hash(), block.hash());
        assert_eq!(decoded.transactions.len(), 2);

        let header_only = Block::from_header(block.header.clone());
        assert!(header_only.is_header_only());
        assert!(header_only.serialized_size() < block.serialized_size());
    }
}
