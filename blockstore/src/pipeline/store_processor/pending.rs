use granary_blockstore_core::{
    BlockHashMap,
    block::Block,
    chain::ChainedHeaderBlock,
    tx::{Transaction, TransactionId},
};
use granary_hashes::Hash;
use parking_lot::Mutex;
use std::sync::Arc;

struct PendingEntry {
    item: ChainedHeaderBlock,
    // The same block may be queued again before its earlier copy is flushed
    refs: usize,
}

#[derive(Default)]
struct Inner {
    blocks: BlockHashMap<PendingEntry>,
    // Owning blocks per transaction, most recently queued last
    transactions: BlockHashMap<Vec<Hash>>,
}

/// Blocks handed to the store but not yet durable. Reads consult this set before the repository.
#[derive(Default)]
pub struct PendingSet {
    inner: Mutex<Inner>,
}

impl PendingSet {
    pub fn insert(&self, item: ChainedHeaderBlock) {
        let mut inner = self.inner.lock();
        let hash = item.hash();
        if let Some(entry) = inner.blocks.get_mut(&hash) {
            entry.refs += 1;
            return;
        }
        for tx in item.block().transactions.iter() {
            inner.transactions.entry(tx.id()).or_default().push(hash);
        }
        inner.blocks.insert(hash, PendingEntry { item, refs: 1 });
    }

    /// Releases one queued copy of each hash
    pub fn remove_many(&self, hashes: impl Iterator<Item = Hash>) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        for hash in hashes {
            let Some(entry) = inner.blocks.get_mut(&hash) else {
                continue;
            };
            entry.refs -= 1;
            if entry.refs > 0 {
                continue;
            }
            let Some(entry) = inner.blocks.remove(&hash) else {
                continue;
            };
            for tx in entry.item.block().transactions.iter() {
                let id = tx.id();
                if let Some(owners) = inner.transactions.get_mut(&id) {
                    owners.retain(|owner| *owner != hash);
                    if owners.is_empty() {
                        inner.transactions.remove(&id);
                    }
                }
            }
        }
    }

    pub fn get_block(&self, hash: Hash) -> Option<Arc<Block>> {
        self.inner.lock().blocks.get(&hash).map(|entry| entry.item.block().clone())
    }

    pub fn contains(&self, hash: Hash) -> bool {
        self.inner.lock().blocks.contains_key(&hash)
    }

    pub fn get_block_id_for_transaction(&self, id: TransactionId) -> Option<Hash> {
        self.inner.lock().transactions.get(&id).and_then(|owners| owners.last().copied())
    }

    pub fn get_transaction(&self, id: TransactionId) -> Option<Transaction> {
        let inner = self.inner.lock();
        let owner = inner.transactions.get(&id)?.last()?;
        inner.blocks.get(owner)?.item.block().transactions.iter().find(|tx| tx.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ChainBuilder;

    #[test]
    fn test_pending_reads_and_release() {
        let pending = PendingSet::default();
        let mut builder = ChainBuilder::from_genesis().with_txs_per_block(2);
        let chain = builder.extend(2);
        chain.iter().cloned().for_each(|item| pending.insert(item));

        assert_eq!(pending.len(), 2);
        assert_eq!(pending.get_block(chain[1].hash()).map(|b| b.hash()), Some(chain[1].hash()));
        let tx = chain[0].block().transactions[1].clone();
        assert_eq!(pending.get_block_id_for_transaction(tx.id()), Some(chain[0].hash()));
        assert_eq!(pending.get_transaction(tx.id()), Some(tx.clone()));

        pending.remove_many(std::iter::once(chain[0].hash()));
        assert!(!pending.contains(chain[0].hash()));
        assert_eq!(pending.get_transaction(tx.id()), None);
        assert!(pending.contains(chain[1].hash()));
    }

    #[test]
    fn test_requeued_block_survives_first_release() {
        let pending = PendingSet::default();
        let mut builder = ChainBuilder::from_genesis();
        let block = builder.next_block();
        pending.insert(block.clone());
        pending.insert(block.clone());

        pending.remove_many(std::iter::once(block.hash()));
        assert!(pending.contains(block.hash()));
        pending.remove_many(std::iter::once(block.hash()));
        assert!(pending.is_empty());
    }
}
