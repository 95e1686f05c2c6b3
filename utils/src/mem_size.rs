//! Memory-size estimation for cached objects. A cache tracking its budget asks each entry for
//! either a byte estimate or a unit count; the two must not be mixed for the same cache.

use std::{mem::size_of, sync::Arc};

/// How a cache measures the entries it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemMode {
    Bytes,
    Units,
}

/// Estimates the deep memory owned by an object. Fixed-size objects and containers of fixed-size
/// items implement `estimate_mem_units`; objects of varying runtime size implement
/// `estimate_mem_bytes`. The unimplemented side panics, so a cache configured with the wrong mode
/// for its data is caught by tests.
pub trait MemSizeEstimator {
    fn estimate_size(&self, mem_mode: MemMode) -> usize {
        match mem_mode {
            MemMode::Bytes => self.estimate_mem_bytes(),
            MemMode::Units => self.estimate_mem_units(),
        }
    }

    fn estimate_mem_bytes(&self) -> usize {
        unimplemented!()
    }

    fn estimate_mem_units(&self) -> usize {
        unimplemented!()
    }
}

macro_rules! unit_sized {
    ($($t:ty),*) => {
        $(
            impl MemSizeEstimator for $t {
                fn estimate_mem_units(&self) -> usize {
                    1
                }

                fn estimate_mem_bytes(&self) -> usize {
                    size_of::<$t>()
                }
            }
        )*
    };
}

unit_sized!(bool, u8, u16, u32, u64);

impl<T> MemSizeEstimator for Vec<T> {
    fn estimate_mem_units(&self) -> usize {
        self.len()
    }

    fn estimate_mem_bytes(&self) -> usize {
        size_of::<Self>() + self.capacity() * size_of::<T>()
    }
}

impl<T: MemSizeEstimator> MemSizeEstimator for Arc<T> {
    fn estimate_mem_bytes(&self) -> usize {
        self.as_ref().estimate_mem_bytes() + size_of::<Self>()
    }

    fn estimate_mem_units(&self) -> usize {
        self.as_ref().estimate_mem_units()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_modes() {
        let v: Vec<u64> = Vec::with_capacity(4);
        assert_eq!(v.estimate_size(MemMode::Units), 0);
        assert_eq!(v.estimate_size(MemMode::Bytes), size_of::<Vec<u64>>() + 4 * 8);
        let shared = Arc::new(7u64);
        assert_eq!(shared.estimate_size(MemMode::Units), 1);
        assert_eq!(shared.estimate_size(MemMode::Bytes), 8 + size_of::<Arc<u64>>());
    }
}
