use enum_primitive_derive::Primitive;

/// `u8::MAX` is reserved as the separator between a prefix and the key it scopes, and through
/// [`DatabaseStorePrefixes::Separator`] it can never be used as a prefix itself
pub const SEPARATOR: u8 = u8::MAX;

/// One-byte prefixes of the logical tables
#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatabaseStorePrefixes {
    /// block hash -> serialized block
    Blocks = 1,
    /// transaction id -> owning block hash, present only while the tx index is enabled
    Transactions = 2,
    /// fixed markers, see [`CommonKeys`]
    Common = 3,

    // ---- Separator ----
    /// Reserved as a separator
    Separator = SEPARATOR,
}

/// Single-byte markers under [`DatabaseStorePrefixes::Common`]
#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommonKeys {
    RepositoryTip = 1,
    TxIndexFlag = 2,
    PrunedTip = 3,
}

impl From<DatabaseStorePrefixes> for Vec<u8> {
    fn from(value: DatabaseStorePrefixes) -> Self {
        [value as u8].to_vec()
    }
}

impl From<DatabaseStorePrefixes> for u8 {
    fn from(value: DatabaseStorePrefixes) -> Self {
        value as u8
    }
}

impl AsRef<[u8]> for DatabaseStorePrefixes {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: enum has repr(u8)
        std::slice::from_ref(unsafe { &*(self as *const Self as *const u8) })
    }
}

impl AsRef<[u8]> for CommonKeys {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: enum has repr(u8)
        std::slice::from_ref(unsafe { &*(self as *const Self as *const u8) })
    }
}
