use blake2b_simd::{Params, PERSONALBYTES};
use cas_types::{Key, KEY_SIZE};

/// Fixed prefix of every personalization string.
const PERSONAL_PREFIX: &[u8] = b"cas:";

/// Longest type tag that fits next to the prefix in BLAKE2b's 16-byte
/// personalization block.
pub const MAX_TYPE_LEN: usize = PERSONALBYTES - PERSONAL_PREFIX.len();

/// Written over the leading bytes of a digest that would otherwise fall into
/// the reserved key range.
const COLLISION_MARKER: &[u8; 8] = b"cas-blob";

/// Type- and level-separated BLAKE2b chunk hasher.
///
/// Each hasher carries a chunk type tag (e.g. `"blob"`, `"dir"`) that is
/// folded into the BLAKE2b personalization as `"cas:" + type`. Tags longer
/// than [`MAX_TYPE_LEN`] bytes do not fit and are refused, never cut short.
/// The chunk's tree level is passed as the BLAKE2b `node_depth` parameter. A leaf and a pointer chunk with identical
/// bytes, or two chunks of different types, therefore hash differently.
///
/// Zero-length content always hashes to [`Key::Empty`], whatever the type
/// and level.
#[derive(Clone, Copy, Debug)]
pub struct ChunkHasher<'a> {
    chunk_type: &'a str,
}

impl<'a> ChunkHasher<'a> {
    /// Create a hasher for chunks of the given type.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_type` is longer than [`MAX_TYPE_LEN`] bytes. Use
    /// [`ChunkHasher::try_new`] for tags that have not been validated.
    pub const fn new(chunk_type: &'a str) -> Self {
        assert!(
            chunk_type.len() <= MAX_TYPE_LEN,
            "chunk type tag does not fit the personalization block"
        );
        Self { chunk_type }
    }

    /// Create a hasher, or `None` if the tag is longer than [`MAX_TYPE_LEN`].
    pub const fn try_new(chunk_type: &'a str) -> Option<Self> {
        if chunk_type.len() > MAX_TYPE_LEN {
            return None;
        }
        Some(Self { chunk_type })
    }

    /// Hash chunk bytes at the given tree level.
    pub fn hash(&self, data: &[u8], level: u8) -> Key {
        if data.is_empty() {
            return Key::Empty;
        }
        let digest = self.params(level).hash(data);
        let mut raw = [0u8; KEY_SIZE];
        raw.copy_from_slice(digest.as_bytes());
        finalize(raw)
    }

    /// Verify that data at `level` produces the expected key.
    pub fn verify(&self, data: &[u8], level: u8, expected: &Key) -> bool {
        self.hash(data, level) == *expected
    }

    /// The chunk type tag used by this hasher.
    pub fn chunk_type(&self) -> &str {
        self.chunk_type
    }

    fn params(&self, level: u8) -> Params {
        let mut personal = [0u8; PERSONALBYTES];
        let prefix = PERSONAL_PREFIX.len();
        let tag = self.chunk_type.as_bytes();
        personal[..prefix].copy_from_slice(PERSONAL_PREFIX);
        personal[prefix..prefix + tag.len()].copy_from_slice(tag);

        let mut params = Params::new();
        params
            .hash_length(KEY_SIZE)
            .personal(&personal)
            .node_depth(level);
        params
    }
}

/// Turn a raw digest into a key, steering it out of the reserved range.
///
/// # Panics
///
/// Panics if the marker itself decodes into the reserved range. That can only
/// follow from a bad `COLLISION_MARKER` constant, never from input data.
fn finalize(mut raw: [u8; KEY_SIZE]) -> Key {
    let key = Key::from_bytes(&raw).unwrap_or(Key::Invalid);
    if key.is_content() {
        return key;
    }
    raw[..COLLISION_MARKER.len()].copy_from_slice(COLLISION_MARKER);
    match Key::from_bytes(&raw) {
        Ok(key) if key.is_content() => key,
        _ => panic!("collision marker lands in the reserved key range"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BLOB: ChunkHasher<'static> = ChunkHasher::new("blob");

    #[test]
    fn empty_content_is_empty_key() {
        assert_eq!(BLOB.hash(b"", 0), Key::Empty);
        assert_eq!(BLOB.hash(b"", 7), Key::Empty);
        assert_eq!(ChunkHasher::new("dir").hash(b"", 0), Key::Empty);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(BLOB.hash(b"hello world", 0), BLOB.hash(b"hello world", 0));
    }

    #[test]
    fn known_digests() {
        // BLAKE2b-512, personal = "cas:blob", node_depth = level.
        assert_eq!(
            BLOB.hash(b"hello", 0).to_hex(),
            "3ad5d725e60c491bde6ab4ecc554b4940999ad9f35482c9051a4b26f956f5150\
             c17051487b4b0e0db74384d8f584551f24c7569fc91799e07bde38c0d14415cd"
        );
        assert_eq!(
            BLOB.hash(b"hello", 1).to_hex(),
            "9a7ef9a16335e1dbd768a4d31f08cd4a92994e626f39ef2a9a251972fdcb5651\
             505711f8732ff33056820469438d10bfd905d821305b5e2a1fb4d8b6b708b140"
        );
        assert_eq!(
            ChunkHasher::new("other").hash(b"hello", 0).to_hex(),
            "e4cca79022e03528aa6809a823321155bc1bdf566897b13edec3ef4bf5fb59b0\
             b5bf0320e57276845def1ef7742fab4b6e6127d05a373f9bf0cebb8be3d7399a"
        );
    }

    #[test]
    fn level_separates_hashes() {
        assert_ne!(BLOB.hash(b"same", 0), BLOB.hash(b"same", 1));
    }

    #[test]
    fn type_separates_hashes() {
        let dir = ChunkHasher::new("dir");
        assert_ne!(BLOB.hash(b"same", 0), dir.hash(b"same", 0));
    }

    #[test]
    fn longest_tags_still_separate() {
        let pdf = ChunkHasher::new("app/pdf-0001");
        let zip = ChunkHasher::new("app/pdf-0002");
        assert_eq!(pdf.chunk_type().len(), MAX_TYPE_LEN);
        assert_ne!(pdf.hash(b"same", 0), zip.hash(b"same", 0));
    }

    #[test]
    fn overlong_tags_are_refused() {
        assert!(ChunkHasher::try_new("application/pdf").is_none());
        assert!(ChunkHasher::try_new("application/").is_some());
        assert_eq!(MAX_TYPE_LEN, 12);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn overlong_tag_panics_in_new() {
        ChunkHasher::new("application/zip");
    }

    #[test]
    fn verify_roundtrip() {
        let key = BLOB.hash(b"data", 2);
        assert!(BLOB.verify(b"data", 2, &key));
        assert!(!BLOB.verify(b"data", 1, &key));
        assert!(!BLOB.verify(b"tampered", 2, &key));
    }

    #[test]
    fn reserved_digest_gets_marker() {
        let key = finalize([0u8; KEY_SIZE]);
        assert!(key.is_content());
        assert_eq!(&key.to_bytes()[..8], b"cas-blob");

        let mut raw = [0u8; KEY_SIZE];
        raw[KEY_SIZE - 1] = 0x42;
        let key = finalize(raw);
        assert_eq!(&key.to_bytes()[..8], b"cas-blob");
        assert_eq!(key.to_bytes()[KEY_SIZE - 1], 0x42);
    }

    #[test]
    fn ordinary_digest_is_untouched() {
        let raw = [0x33u8; KEY_SIZE];
        assert_eq!(finalize(raw).to_bytes(), raw);
    }

    #[test]
    fn chunk_type_accessor() {
        assert_eq!(BLOB.chunk_type(), "blob");
        assert_eq!(hex::encode(PERSONAL_PREFIX), "6361733a");
    }

    proptest! {
        #[test]
        fn nonempty_content_never_hashes_to_sentinel(
            data in proptest::collection::vec(any::<u8>(), 1..256),
            level in 0u8..8,
        ) {
            prop_assert!(BLOB.hash(&data, level).is_content());
        }
    }
}
