use crate::header::Header;
use granary_hashes::{Hash, HasherBase};

/// Returns the header hash. The cached `hash` field is not part of the preimage.
pub fn hash(header: &Header) -> Hash {
    let mut hasher = granary_hashes::BlockHash::new();
    hasher
        .update(header.version.to_le_bytes())
        .update(header.hash_prev_block)
        .update(header.hash_merkle_root)
        .update(header.timestamp.to_le_bytes())
        .update(header.bits.to_le_bytes())
        .update(header.nonce.to_le_bytes());
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_hashing() {
        let header = Header::new_finalized(1, 7.into(), Default::default(), 234, 23, 567);
        assert_ne!(Hash::default(), header.hash);
        assert_eq!(hash(&header), header.hash);

        let other = Header::new_finalized(1, 7.into(), Default::default(), 234, 23, 568);
        assert_ne!(header.hash, other.hash);
    }
}
