use crate::{ByteSize, block::Block, errors::chain::ChainError, header::Header};
use granary_hashes::Hash;
use granary_utils::mem_size::MemSizeEstimator;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, mem::size_of, sync::Arc};

/// A `(hash, height)` pointer identifying a tip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashHeightPair {
    pub hash: Hash,
    pub height: u64,
}

impl HashHeightPair {
    pub fn new(hash: Hash, height: u64) -> Self {
        Self { hash, height }
    }
}

impl Display for HashHeightPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.height, self.hash)
    }
}

impl MemSizeEstimator for HashHeightPair {
    fn estimate_mem_units(&self) -> usize {
        1
    }
}

/// A header linked to its predecessor. Chains of these are shared through `Arc`s, so holding
/// any header keeps its whole ancestry alive.
#[derive(Debug)]
pub struct ChainedHeader {
    header: Arc<Header>,
    height: u64,
    previous: Option<Arc<ChainedHeader>>,
}

impl ChainedHeader {
    pub fn genesis(header: Header) -> Arc<Self> {
        Arc::new(Self { header: Arc::new(header), height: 0, previous: None })
    }

    /// Links `header` on top of `previous`
    pub fn new(header: Header, previous: Arc<ChainedHeader>) -> Result<Arc<Self>, ChainError> {
        if header.hash_prev_block != previous.hash() {
            return Err(ChainError::NotAChild { child: header.hash, expected_parent: header.hash_prev_block, parent: previous.hash() });
        }
        Ok(Arc::new(Self { header: Arc::new(header), height: previous.height + 1, previous: Some(previous) }))
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    pub fn prev_hash(&self) -> Hash {
        self.header.hash_prev_block
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    pub fn previous(&self) -> Option<&Arc<ChainedHeader>> {
        self.previous.as_ref()
    }

    pub fn hash_height(&self) -> HashHeightPair {
        HashHeightPair::new(self.hash(), self.height)
    }

    pub fn is_genesis(&self) -> bool {
        self.previous.is_none()
    }

    /// Returns the ancestor at `height` (self included), or `None` above the own height
    pub fn get_ancestor(self: &Arc<Self>, height: u64) -> Option<Arc<ChainedHeader>> {
        if height > self.height {
            return None;
        }
        let mut current = self.clone();
        while current.height > height {
            current = current.previous.clone()?;
        }
        Some(current)
    }

    /// Walks back from self looking for `hash`
    pub fn find_ancestor_or_self(self: &Arc<Self>, hash: Hash) -> Option<Arc<ChainedHeader>> {
        let mut current = Some(self.clone());
        while let Some(header) = current {
            if header.hash() == hash {
                return Some(header);
            }
            current = header.previous.clone();
        }
        None
    }
}

impl Display for ChainedHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.height, self.hash())
    }
}

impl Drop for ChainedHeader {
    fn drop(&mut self) {
        // Unlink iteratively; a recursive drop of a long exclusively-owned chain would overflow the stack
        let mut next = self.previous.take();
        while let Some(previous) = next {
            match Arc::try_unwrap(previous) {
                Ok(mut inner) => next = inner.previous.take(),
                Err(_) => break,
            }
        }
    }
}

/// A validated block paired with its position in the chain
#[derive(Debug, Clone)]
pub struct ChainedHeaderBlock {
    block: Arc<Block>,
    chained_header: Arc<ChainedHeader>,
}

impl ChainedHeaderBlock {
    pub fn new(block: Arc<Block>, chained_header: Arc<ChainedHeader>) -> Result<Self, ChainError> {
        if block.hash() != chained_header.hash() {
            return Err(ChainError::HeaderBlockMismatch { block: block.hash(), header: chained_header.hash() });
        }
        Ok(Self { block, chained_header })
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    pub fn chained_header(&self) -> &Arc<ChainedHeader> {
        &self.chained_header
    }

    pub fn hash(&self) -> Hash {
        self.chained_header.hash()
    }

    pub fn prev_hash(&self) -> Hash {
        self.chained_header.prev_hash()
    }

    pub fn height(&self) -> u64 {
        self.chained_header.height()
    }

    pub fn serialized_size(&self) -> ByteSize {
        self.block.serialized_size()
    }
}

impl MemSizeEstimator for ChainedHeaderBlock {
    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>() + self.block.estimate_mem_bytes()
    }
}
