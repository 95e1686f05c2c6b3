use crate::{HASH_SIZE, Hash};
use sha2::{Digest, Sha256};

pub trait HasherBase {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;
}

pub trait Hasher: HasherBase + Clone + Default {
    fn finalize(self) -> Hash;
    fn reset(&mut self);
    #[inline(always)]
    fn hash<A: AsRef<[u8]>>(data: A) -> Hash {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

macro_rules! sha256d_hasher {
    ($(#[$meta:meta])* $vis:vis struct $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Default)]
        $vis struct $name(Sha256);

        impl $name {
            #[inline]
            pub fn new() -> Self {
                Self(Sha256::new())
            }

            pub fn write<A: AsRef<[u8]>>(&mut self, data: A) {
                self.0.update(data);
            }

            #[inline(always)]
            pub fn finalize(self) -> Hash {
                let first = self.0.finalize();
                let second = Sha256::digest(first);
                let mut out = [0u8; HASH_SIZE];
                out.copy_from_slice(&second);
                Hash::from_bytes(out)
            }
        }

        impl HasherBase for $name {
            #[inline(always)]
            fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
                self.write(data);
                self
            }
        }

        impl Hasher for $name {
            #[inline(always)]
            fn finalize(self) -> Hash {
                // Resolves to the inherent method
                $name::finalize(self)
            }

            fn reset(&mut self) {
                *self = Self::new();
            }
        }
    };
}

sha256d_hasher! {
    /// Double SHA-256 over the serialized header fields.
    pub struct BlockHash
}

sha256d_hasher! {
    /// Double SHA-256 over the serialized transaction.
    pub struct TransactionHash
}

sha256d_hasher! {
    pub struct MerkleBranchHash
}
