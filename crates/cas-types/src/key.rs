use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KeyError;

/// Size of a key on the wire, in bytes.
pub const KEY_SIZE: usize = 64;

/// Keys whose first `RESERVED_PREFIX` bytes are all zero belong to the
/// reserved range. Real digests land there with negligible probability.
const RESERVED_PREFIX: usize = 55;

const INVALID_MARKER: u8 = 0xFE;
const PRIVATE_MARKER: u8 = 0xFF;

/// A 64-byte content hash that is known to lie outside the reserved range.
///
/// Only [`Key::from_bytes`] and [`Key::from_bytes_private`] can produce one,
/// so a `ContentHash` never aliases a sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; KEY_SIZE]);

impl ContentHash {
    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Identifier of a chunk.
///
/// The wire form is always [`KEY_SIZE`] bytes. In memory the sentinel states
/// are explicit variants:
///
/// | Variant | Wire layout |
/// |---|---|
/// | `Empty` | all zero |
/// | `Invalid` | 55 zero bytes, `0xFE`, 8 zero bytes |
/// | `Private(id)` | 55 zero bytes, `0xFF`, `id` as big-endian `u64` |
/// | `Content(_)` | anything with a non-zero byte in the first 55 |
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// The key of zero-length content.
    Empty,
    /// Reserved-range bytes that do not name anything.
    Invalid,
    /// An uncommitted chunk living in a stash. Never valid as persisted input.
    Private(u64),
    /// An ordinary content hash.
    Content(ContentHash),
}

impl Key {
    /// Decode a key from its wire bytes.
    ///
    /// Anything in the reserved range other than the exact Empty pattern
    /// decodes to [`Key::Invalid`], including the Private pattern. Use this
    /// for every key that arrives from storage or from a caller.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        Ok(Self::decode(&fixed(bytes)?, false))
    }

    /// Decode a key, accepting the Private sub-range.
    ///
    /// Only appropriate for bytes that were produced inside a stash.
    pub fn from_bytes_private(bytes: &[u8]) -> Result<Self, KeyError> {
        Ok(Self::decode(&fixed(bytes)?, true))
    }

    /// A Private key carrying `id`.
    pub const fn private(id: u64) -> Self {
        Self::Private(id)
    }

    /// The numeric id of a Private key.
    pub fn private_id(&self) -> Option<u64> {
        match self {
            Self::Private(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private(_))
    }

    pub fn is_content(&self) -> bool {
        matches!(self, Self::Content(_))
    }

    /// The wire layout of this key.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        let mut out = [0u8; KEY_SIZE];
        match self {
            Self::Empty => {}
            Self::Invalid => out[RESERVED_PREFIX] = INVALID_MARKER,
            Self::Private(id) => {
                out[RESERVED_PREFIX] = PRIVATE_MARKER;
                out[RESERVED_PREFIX + 1..].copy_from_slice(&id.to_be_bytes());
            }
            Self::Content(hash) => out = hash.0,
        }
        out
    }

    /// Hex-encoded wire bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.to_bytes()[..4])
    }

    /// Parse from a hex string. Never yields a Private key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    fn decode(raw: &[u8; KEY_SIZE], allow_private: bool) -> Self {
        if raw[..RESERVED_PREFIX].iter().any(|&b| b != 0) {
            return Self::Content(ContentHash(*raw));
        }
        let tail = &raw[RESERVED_PREFIX..];
        if tail.iter().all(|&b| b == 0) {
            return Self::Empty;
        }
        if allow_private && tail[0] == PRIVATE_MARKER {
            let mut id = [0u8; 8];
            id.copy_from_slice(&tail[1..]);
            return Self::Private(u64::from_be_bytes(id));
        }
        Self::Invalid
    }
}

fn fixed(bytes: &[u8]) -> Result<[u8; KEY_SIZE], KeyError> {
    bytes.try_into().map_err(|_| KeyError::InvalidLength {
        expected: KEY_SIZE,
        actual: bytes.len(),
    })
}

impl Default for Key {
    fn default() -> Self {
        Self::Empty
    }
}

impl TryFrom<&[u8]> for Key {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl From<Key> for [u8; KEY_SIZE] {
    fn from(key: Key) -> Self {
        key.to_bytes()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Key(empty)"),
            Self::Invalid => write!(f, "Key(invalid)"),
            Self::Private(id) => write!(f, "Key(private:{id})"),
            Self::Content(_) => write!(f, "Key({})", self.short_hex()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn content(fill: u8) -> Key {
        Key::from_bytes(&[fill; KEY_SIZE]).unwrap()
    }

    fn reserved(tail: [u8; KEY_SIZE - RESERVED_PREFIX]) -> [u8; KEY_SIZE] {
        let mut raw = [0u8; KEY_SIZE];
        raw[RESERVED_PREFIX..].copy_from_slice(&tail);
        raw
    }

    #[test]
    fn all_zero_is_empty() {
        let key = Key::from_bytes(&[0u8; KEY_SIZE]).unwrap();
        assert_eq!(key, Key::Empty);
        assert!(key.is_empty());
        assert_eq!(key.to_bytes(), [0u8; KEY_SIZE]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = Key::from_bytes(&[1u8; 32]).unwrap_err();
        assert_eq!(
            err,
            KeyError::InvalidLength {
                expected: 64,
                actual: 32
            }
        );
        assert!(Key::from_bytes_private(&[]).is_err());
    }

    #[test]
    fn content_outside_reserved_range() {
        let key = content(0xab);
        assert!(key.is_content());
        assert_eq!(key.to_bytes(), [0xab; KEY_SIZE]);
    }

    #[test]
    fn single_nonzero_byte_in_prefix_is_content() {
        let mut raw = [0u8; KEY_SIZE];
        raw[RESERVED_PREFIX - 1] = 1;
        assert!(Key::from_bytes(&raw).unwrap().is_content());
    }

    #[test]
    fn reserved_garbage_is_invalid() {
        let raw = reserved([0, 0, 0, 0, 0, 0, 0, 0, 7]);
        assert_eq!(Key::from_bytes(&raw).unwrap(), Key::Invalid);
        assert_eq!(Key::from_bytes_private(&raw).unwrap(), Key::Invalid);
    }

    #[test]
    fn invalid_roundtrips_through_wire() {
        let raw = Key::Invalid.to_bytes();
        assert_eq!(raw[RESERVED_PREFIX], INVALID_MARKER);
        assert_eq!(Key::from_bytes(&raw).unwrap(), Key::Invalid);
    }

    // -----------------------------------------------------------------------
    // Private sub-range
    // -----------------------------------------------------------------------

    #[test]
    fn private_wire_layout() {
        let raw = Key::private(0x0102_0304_0506_0708).to_bytes();
        assert!(raw[..RESERVED_PREFIX].iter().all(|&b| b == 0));
        assert_eq!(raw[RESERVED_PREFIX], 0xFF);
        assert_eq!(&raw[RESERVED_PREFIX + 1..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn private_is_invalid_unless_allowed() {
        let raw = Key::private(42).to_bytes();
        assert_eq!(Key::from_bytes(&raw).unwrap(), Key::Invalid);
        let key = Key::from_bytes_private(&raw).unwrap();
        assert_eq!(key, Key::Private(42));
        assert_eq!(key.private_id(), Some(42));
    }

    #[test]
    fn private_zero_is_not_empty() {
        let raw = Key::private(0).to_bytes();
        assert_ne!(raw, [0u8; KEY_SIZE]);
        assert_eq!(Key::from_bytes_private(&raw).unwrap(), Key::Private(0));
    }

    #[test]
    fn private_id_of_other_variants() {
        assert_eq!(Key::Empty.private_id(), None);
        assert_eq!(Key::Invalid.private_id(), None);
        assert_eq!(content(9).private_id(), None);
    }

    // -----------------------------------------------------------------------
    // Hex / serde
    // -----------------------------------------------------------------------

    #[test]
    fn hex_roundtrip() {
        let key = content(0x5a);
        assert_eq!(Key::from_hex(&key.to_hex()).unwrap(), key);
        assert_eq!(key.to_hex().len(), 128);
    }

    #[test]
    fn hex_never_yields_private() {
        let hex = Key::private(3).to_hex();
        assert_eq!(Key::from_hex(&hex).unwrap(), Key::Invalid);
    }

    #[test]
    fn bad_hex() {
        assert!(matches!(Key::from_hex("zz"), Err(KeyError::InvalidHex(_))));
        assert!(matches!(
            Key::from_hex("abcd"),
            Err(KeyError::InvalidLength { actual: 2, .. })
        ));
    }

    #[test]
    fn short_hex_is_8_chars() {
        assert_eq!(content(1).short_hex(), "01010101");
    }

    #[test]
    fn debug_names_sentinels() {
        assert_eq!(format!("{:?}", Key::Empty), "Key(empty)");
        assert_eq!(format!("{:?}", Key::private(5)), "Key(private:5)");
        assert_eq!(format!("{:?}", content(0xff)), "Key(ffffffff)");
    }

    #[test]
    fn serde_as_hex_string() {
        let key = content(0x11);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key.to_hex()));
        let parsed: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn default_is_empty() {
        assert_eq!(Key::default(), Key::Empty);
    }

    proptest! {
        #[test]
        fn wire_roundtrip_preserves_decoded_key(raw in proptest::collection::vec(any::<u8>(), KEY_SIZE)) {
            let key = Key::from_bytes_private(&raw).unwrap();
            let again = Key::from_bytes_private(&key.to_bytes()).unwrap();
            prop_assert_eq!(key, again);
        }

        #[test]
        fn private_ids_roundtrip(id in any::<u64>()) {
            let key = Key::from_bytes_private(&Key::private(id).to_bytes()).unwrap();
            prop_assert_eq!(key.private_id(), Some(id));
        }
    }
}
