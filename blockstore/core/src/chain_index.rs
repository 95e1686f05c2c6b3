use crate::{BlockHashMap, chain::ChainedHeader};
use granary_hashes::Hash;
use parking_lot::RwLock;
use std::sync::Arc;

/// Read access to the canonical chain of headers, owned by the consensus layer. The store only
/// references headers it gets from here; it never creates canonical entries itself.
pub trait ChainIndex: Send + Sync {
    fn genesis(&self) -> Arc<ChainedHeader>;

    fn tip(&self) -> Arc<ChainedHeader>;

    /// Returns the header if `hash` is on the canonical chain
    fn get_header(&self, hash: Hash) -> Option<Arc<ChainedHeader>>;

    /// Returns the canonical header at `height`
    fn get_header_at_height(&self, height: u64) -> Option<Arc<ChainedHeader>>;

    fn contains(&self, hash: Hash) -> bool {
        self.get_header(hash).is_some()
    }

    fn height(&self) -> u64 {
        self.tip().height()
    }

    /// Moves the working tip, rewinding the canonical chain when `tip` forks off it
    fn set_tip(&self, tip: Arc<ChainedHeader>);
}

pub type DynChainIndex = Arc<dyn ChainIndex>;

struct Inner {
    by_height: Vec<Arc<ChainedHeader>>,
    heights: BlockHashMap<u64>,
    tip: Arc<ChainedHeader>,
}

/// A [`ChainIndex`] holding the canonical chain in memory
pub struct MemoryChainIndex {
    inner: RwLock<Inner>,
}

impl MemoryChainIndex {
    pub fn new(genesis: Arc<ChainedHeader>) -> Self {
        let mut heights = BlockHashMap::default();
        heights.insert(genesis.hash(), 0);
        Self { inner: RwLock::new(Inner { by_height: vec![genesis.clone()], heights, tip: genesis }) }
    }

    /// Builds an index whose canonical chain ends at `tip`
    pub fn with_tip(tip: Arc<ChainedHeader>) -> Self {
        let genesis = tip.get_ancestor(0).unwrap_or_else(|| tip.clone());
        let index = Self::new(genesis);
        index.set_tip(tip);
        index
    }
}

impl ChainIndex for MemoryChainIndex {
    fn genesis(&self) -> Arc<ChainedHeader> {
        let inner = self.inner.read();
        inner.by_height.first().cloned().unwrap_or_else(|| inner.tip.clone())
    }

    fn tip(&self) -> Arc<ChainedHeader> {
        self.inner.read().tip.clone()
    }

    fn get_header(&self, hash: Hash) -> Option<Arc<ChainedHeader>> {
        let inner = self.inner.read();
        let height = *inner.heights.get(&hash)?;
        inner.by_height.get(height as usize).cloned()
    }

    fn get_header_at_height(&self, height: u64) -> Option<Arc<ChainedHeader>> {
        self.inner.read().by_height.get(height as usize).cloned()
    }

    fn set_tip(&self, tip: Arc<ChainedHeader>) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        // Collect the new segment down to the first header already on the canonical chain
        let mut segment = Vec::new();
        let mut current = Some(tip.clone());
        let fork_height = loop {
            match current {
                Some(header) if inner.heights.get(&header.hash()) == Some(&header.height()) => break Some(header.height()),
                Some(header) => {
                    let previous = header.previous().cloned();
                    segment.push(header);
                    current = previous;
                }
                None => break None,
            }
        };

        let keep = match fork_height {
            Some(height) => height as usize + 1,
            // Entirely unrelated chain (never happens with a shared genesis); replace everything
            None => 0,
        };
        for removed in inner.by_height.drain(keep..) {
            inner.heights.remove(&removed.hash());
        }
        for header in segment.into_iter().rev() {
            inner.heights.insert(header.hash(), header.height());
            inner.by_height.push(header);
        }
        inner.tip = tip;
    }
}
