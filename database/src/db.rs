use rocksdb::{DBWithThreadMode, MultiThreaded};
use std::{
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};

pub use conn_builder::ConnBuilder;

mod conn_builder;

/// The DB type used for granary stores
pub struct DB {
    inner: DBWithThreadMode<MultiThreaded>,
}

impl DB {
    pub fn new(inner: DBWithThreadMode<MultiThreaded>) -> Self {
        Self { inner }
    }

    /// Runs a manual compaction over every key starting with `prefix`, reclaiming the space held by
    /// tombstones left behind by deletions under that prefix.
    pub fn compact_prefix(&self, prefix: &[u8]) {
        let (from, to) = prefix_bounds(prefix);
        self.inner.compact_range(Some(from), to);
    }

    pub fn path_buf(&self) -> PathBuf {
        self.inner.path().to_path_buf()
    }
}

/// Returns the `[from, to)` range covering all keys prefixed by `prefix`. `to` is `None` when the
/// prefix consists only of `0xff` bytes and the range is therefore open-ended.
pub(crate) fn prefix_bounds(prefix: &[u8]) -> (Vec<u8>, Option<Vec<u8>>) {
    let from = prefix.to_vec();
    let mut to = prefix.to_vec();
    while let Some(last) = to.pop() {
        if last < u8::MAX {
            to.push(last + 1);
            return (from, Some(to));
        }
    }
    (from, None)
}

impl DerefMut for DB {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Deref for DB {
    type Target = DBWithThreadMode<MultiThreaded>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Deletes an existing DB if it exists
pub fn delete_db(db_dir: impl AsRef<Path>) -> Result<(), rocksdb::Error> {
    let db_dir = db_dir.as_ref();
    if !db_dir.exists() {
        return Ok(());
    }
    let options = rocksdb::Options::default();
    DBWithThreadMode::<MultiThreaded>::destroy(&options, db_dir)
}
