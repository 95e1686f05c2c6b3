use crate::hashing;
use granary_hashes::Hash;
use granary_utils::mem_size::MemSizeEstimator;
use serde::{Deserialize, Serialize};
use std::mem::size_of;

/// Represents the ID of a transaction
pub type TransactionId = Hash;

pub type TransactionIndexType = u32;

/// Represents a specific output of a transaction
#[derive(Eq, Hash, PartialEq, Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: TransactionIndexType,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self { transaction_id, index }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    pub signature_script: Vec<u8>,
    pub sequence: u64,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, signature_script: Vec<u8>, sequence: u64) -> Self {
        Self { previous_outpoint, signature_script, sequence }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub value: u64,
    pub script_public_key: Vec<u8>,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: Vec<u8>) -> Self {
        Self { value, script_public_key }
    }
}

/// A transaction as carried inside a block. The store treats everything but `id` as opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub version: u16,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u64,
    pub payload: Vec<u8>,

    /// Cached, persisted with the transaction so reads do not rehash
    id: TransactionId,
}

impl Transaction {
    pub fn new(version: u16, inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, lock_time: u64, payload: Vec<u8>) -> Self {
        let mut tx = Self { version, inputs, outputs, lock_time, payload, id: Default::default() };
        tx.finalize();
        tx
    }

    /// Recomputes the cached id; required after mutating any field
    pub fn finalize(&mut self) {
        self.id = hashing::tx::id(self);
    }

    /// Returns the transaction ID
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// A coinbase spends nothing
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl MemSizeEstimator for Transaction {
    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>()
            + self.payload.len()
            + self.inputs.iter().map(|i| size_of::<TransactionInput>() + i.signature_script.len()).sum::<usize>()
            + self.outputs.iter().map(|o| size_of::<TransactionOutput>() + o.script_public_key.len()).sum::<usize>()
    }
}
