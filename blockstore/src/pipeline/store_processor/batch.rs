use granary_blockstore_core::{ByteSize, chain::ChainedHeaderBlock};

/// Blocks received since the last flush, in arrival order
#[derive(Default)]
pub struct Batch {
    items: Vec<ChainedHeaderBlock>,
    bytes: ByteSize,
}

impl Batch {
    pub fn push(&mut self, item: ChainedHeaderBlock) {
        self.bytes += item.serialized_size();
        self.items.push(item);
    }

    pub fn items(&self) -> &[ChainedHeaderBlock] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Accumulated serialized size of the batched blocks
    pub fn bytes(&self) -> ByteSize {
        self.bytes
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.bytes = 0;
    }

    pub fn clean(&self) -> Vec<ChainedHeaderBlock> {
        clean_batch(&self.items)
    }
}

/// Reduces `items` to the single chain ending at the newest entry, oldest first. Entries that are
/// not ancestors of the newest one belong to branches a later reorg abandoned and are dropped.
pub fn clean_batch(items: &[ChainedHeaderBlock]) -> Vec<ChainedHeaderBlock> {
    let Some(newest) = items.last() else {
        return Vec::new();
    };
    let mut clean = vec![newest.clone()];
    let mut expected = newest.prev_hash();
    for item in items.iter().rev().skip(1) {
        if item.hash() == expected {
            expected = item.prev_hash();
            clean.push(item.clone());
        }
    }
    clean.reverse();
    clean
}
