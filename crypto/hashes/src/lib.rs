mod hashers;

use granary_utils::mem_size::MemSizeEstimator;
use serde::{Deserialize, Serialize};
use std::{
    array::TryFromSliceError,
    fmt::{Debug, Display, Formatter},
    hash::{Hash as StdHash, Hasher as StdHasher},
    str::{self, FromStr},
};

pub use hashers::*;

pub const HASH_SIZE: usize = 32;

/// A 32-byte digest. Ordering is plain byte-lexicographic over the raw bytes, which is also the
/// order in which multi-key store writes are applied.
#[derive(PartialEq, Eq, Clone, Copy, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    #[inline(always)]
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    #[inline(always)]
    pub const fn as_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    /// Builds a hash whose first eight bytes hold `word` in little-endian order, the rest zero.
    /// Mostly useful for tests and well-known constants.
    #[inline(always)]
    pub const fn from_u64_word(word: u64) -> Self {
        let le = word.to_le_bytes();
        let mut bytes = [0u8; HASH_SIZE];
        let mut i = 0;
        while i < 8 {
            bytes[i] = le[i];
            i += 1;
        }
        Hash(bytes)
    }

    #[inline(always)]
    pub fn to_le_u64(self) -> [u64; 4] {
        let mut out = [0u64; 4];
        out.iter_mut().zip(self.0.chunks_exact(8)).for_each(|(word, chunk)| *word = u64::from_le_bytes(chunk.try_into().unwrap()));
        out
    }

    pub fn iter_le_u64(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        self.0.chunks_exact(8).map(|chunk| u64::from_le_bytes(chunk.try_into().unwrap()))
    }
}

pub const ZERO_HASH: Hash = Hash([0u8; HASH_SIZE]);

impl StdHash for Hash {
    #[inline(always)]
    fn hash<H: StdHasher>(&self, state: &mut H) {
        // Digests are uniformly distributed so a single word is enough for hash maps
        state.write_u64(self.to_le_u64()[0]);
    }
}

impl From<u64> for Hash {
    #[inline(always)]
    fn from(word: u64) -> Self {
        Self::from_u64_word(word)
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Hash(value.try_into()?))
    }
}

impl AsRef<[u8; HASH_SIZE]> for Hash {
    #[inline(always)]
    fn as_ref(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for Hash {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; HASH_SIZE * 2];
        faster_hex::hex_encode(&self.0, &mut hex).map_err(|_| std::fmt::Error)?;
        f.write_str(str::from_utf8(&hex).map_err(|_| std::fmt::Error)?)
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Hash {
    type Err = faster_hex::Error;

    fn from_str(hash_str: &str) -> Result<Self, Self::Err> {
        if hash_str.len() != HASH_SIZE * 2 {
            return Err(faster_hex::Error::InvalidLength(hash_str.len()));
        }
        let mut bytes = [0u8; HASH_SIZE];
        faster_hex::hex_decode(hash_str.as_bytes(), &mut bytes)?;
        Ok(Hash(bytes))
    }
}

impl MemSizeEstimator for Hash {
    fn estimate_mem_units(&self) -> usize {
        1
    }

    fn estimate_mem_bytes(&self) -> usize {
        HASH_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_basics() {
        let hash_str = "8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3af";
        let hash = Hash::from_str(hash_str).unwrap();
        assert_eq!(hash_str, hash.to_string());
        assert_eq!(hash_str, format!("{:?}", hash));
        let hash2 = Hash::from_str(hash_str).unwrap();
        assert_eq!(hash, hash2);

        let hash3 = Hash::from_str("8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3ab").unwrap();
        assert_ne!(hash2, hash3);

        assert!(Hash::from_str("8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3a").is_err());
        assert!(Hash::from_str("8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3").is_err());
        assert!(Hash::from_str("zz40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3af").is_err());
    }

    #[test]
    fn test_byte_lexicographic_order() {
        let mut low = [0u8; HASH_SIZE];
        let mut high = [0u8; HASH_SIZE];
        low[0] = 1;
        low[31] = 0xff;
        high[0] = 2;
        assert!(Hash::from_bytes(low) < Hash::from_bytes(high));
        // Little-endian words do not sort like integers
        assert!(Hash::from_u64_word(256) > Hash::from_u64_word(1));
        assert!(Hash::from_u64_word(256) < Hash::from_u64_word(2));
    }

    #[test]
    fn test_slice_conversion() {
        let hash = Hash::from_u64_word(42);
        let bytes: &[u8] = hash.as_ref();
        assert_eq!(Hash::try_from(bytes).unwrap(), hash);
        assert!(Hash::try_from(&bytes[1..]).is_err());
        assert_eq!(hash.to_le_u64(), [42, 0, 0, 0]);
    }

    #[test]
    fn test_bincode_is_raw_bytes() {
        let hash = Hash::from_u64_word(7);
        let encoded = bincode::serialize(&hash).unwrap();
        assert_eq!(encoded.len(), HASH_SIZE);
        assert_eq!(bincode::deserialize::<Hash>(&encoded).unwrap(), hash);
    }
}
