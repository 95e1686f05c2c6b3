//! Data model and collaborator interfaces of the granary block store.

use std::{
    collections::{HashMap, HashSet},
    hash::{BuildHasherDefault, Hasher},
};

pub use granary_hashes::Hash;

pub mod block;
pub mod chain;
pub mod chain_index;
pub mod chain_state;
pub mod config;
pub mod errors;
pub mod hashing;
pub mod header;
pub mod merkle;
pub mod tx;

/// Integer type for accumulated block sizes and byte budgets
pub type ByteSize = u64;

/// Map keyed by block or transaction hashes, using the pass-through [`BlockHasher`]
pub type BlockHashMap<V> = HashMap<Hash, V, BlockHasher>;
pub type BlockHashSet = HashSet<Hash, BlockHasher>;

pub type BlockHasher = BuildHasherDefault<BlockHashHasher>;

/// Hashes are uniformly distributed already, so the map hasher just forwards the first word
/// written by `Hash`'s `std::hash::Hash` impl
#[derive(Default, Clone, Copy)]
pub struct BlockHashHasher(u64);

impl Hasher for BlockHashHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    #[inline]
    fn write_u64(&mut self, v: u64) {
        self.0 = v;
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        // Only reached for key types other than `Hash`; fold the bytes so the hasher stays usable
        for chunk in bytes.chunks(8) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            self.0 = self.0.rotate_left(5) ^ u64::from_le_bytes(word);
        }
    }
}
