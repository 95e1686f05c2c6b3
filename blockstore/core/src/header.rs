use crate::hashing;
use granary_hashes::Hash;
use granary_utils::mem_size::MemSizeEstimator;
use serde::{Deserialize, Serialize};
use std::mem::size_of;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Cached hash
    pub hash: Hash,
    pub version: u16,
    pub hash_prev_block: Hash,
    pub hash_merkle_root: Hash,
    /// Timestamp is in seconds
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
}

impl Header {
    pub fn new_finalized(version: u16, hash_prev_block: Hash, hash_merkle_root: Hash, timestamp: u64, bits: u32, nonce: u64) -> Self {
        let mut header = Self { hash: Default::default(), version, hash_prev_block, hash_merkle_root, timestamp, bits, nonce };
        header.finalize();
        header
    }

    /// Finalizes the header and recomputes the header hash
    pub fn finalize(&mut self) {
        self.hash = hashing::header::hash(self);
    }
}

impl MemSizeEstimator for Header {
    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>()
    }
}
