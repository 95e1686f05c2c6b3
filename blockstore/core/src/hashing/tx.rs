use super::HasherExtensions;
use crate::tx::{Transaction, TransactionId};
use granary_hashes::HasherBase;

/// Returns the transaction id. The cached `id` field is not part of the preimage.
pub fn id(tx: &Transaction) -> TransactionId {
    let mut hasher = granary_hashes::TransactionHash::new();
    hasher.update(tx.version.to_le_bytes()).write_len(tx.inputs.len());
    for input in tx.inputs.iter() {
        hasher
            .update(input.previous_outpoint.transaction_id)
            .update(input.previous_outpoint.index.to_le_bytes())
            .write_var_bytes(&input.signature_script)
            .update(input.sequence.to_le_bytes());
    }
    hasher.write_len(tx.outputs.len());
    for output in tx.outputs.iter() {
        hasher.update(output.value.to_le_bytes()).write_var_bytes(&output.script_public_key);
    }
    hasher.update(tx.lock_time.to_le_bytes()).write_var_bytes(&tx.payload);
    hasher.finalize()
}
