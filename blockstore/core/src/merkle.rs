use granary_hashes::{Hash, HasherBase, MerkleBranchHash, ZERO_HASH};

/// Computes the merkle root over `hashes`, duplicating the last node of odd-sized levels.
/// An empty input yields [`ZERO_HASH`].
pub fn calc_merkle_root(hashes: impl ExactSizeIterator<Item = Hash>) -> Hash {
    let mut level: Vec<Hash> = hashes.collect();
    if level.is_empty() {
        return ZERO_HASH;
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let (left, right) = (pair[0], *pair.get(1).unwrap_or(&pair[0]));
                let mut hasher = MerkleBranchHash::new();
                hasher.update(left).update(right);
                hasher.finalize()
            })
            .collect();
    }
    level[0]
}
