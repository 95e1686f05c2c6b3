use crate::registry::{DatabaseStorePrefixes, SEPARATOR};
use num_traits::FromPrimitive;
use std::fmt::{Debug, Display};

/// A full store key: `prefix | SEPARATOR | key`. `prefix_len` covers the separator, so
/// `path[prefix_len..]` is always the caller's key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DbKey {
    path: Vec<u8>,
    prefix_len: usize,
}

impl DbKey {
    pub fn new<TKey>(prefix: &[u8], key: TKey) -> Self
    where
        TKey: AsRef<[u8]>,
    {
        let key = key.as_ref();
        let mut path = Vec::with_capacity(prefix.len() + 1 + key.len());
        path.extend_from_slice(prefix);
        path.push(SEPARATOR);
        path.extend_from_slice(key);
        Self { path, prefix_len: prefix.len() + 1 }
    }

    pub fn prefix_only(prefix: &[u8]) -> Self {
        Self::new(prefix, [])
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    pub fn key(&self) -> &[u8] {
        &self.path[self.prefix_len..]
    }

    pub fn into_path(self) -> Vec<u8> {
        self.path
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}

impl Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = &self.path[..self.prefix_len - 1];
        match prefix.first().and_then(|&p| DatabaseStorePrefixes::from_u8(p)) {
            Some(store) if prefix.len() == 1 => write!(f, "{:?}", store)?,
            _ => f.write_str(&faster_hex::hex_string(prefix))?,
        }
        f.write_str("/")?;
        f.write_str(&faster_hex::hex_string(self.key()))
    }
}

impl Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}
