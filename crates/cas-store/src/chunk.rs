use cas_crypto::{ChunkHasher, MAX_TYPE_LEN};
use cas_types::Key;

use crate::error::{StoreError, StoreResult};

/// The unit of storage: a type tag, a tree level and the chunk bytes.
///
/// Level 0 chunks are leaves holding raw content. Chunks at higher levels are
/// pointer chunks whose bytes are a packed array of child keys. Stored bytes
/// may be shorter than the nominal chunk size; readers treat the missing tail
/// as zeros.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Logical type of the blob this chunk belongs to.
    pub chunk_type: String,
    /// Distance from the leaves; 0 for leaf chunks.
    pub level: u8,
    /// The chunk contents.
    pub buf: Vec<u8>,
}

impl Chunk {
    /// Create a chunk from its parts.
    pub fn new(chunk_type: impl Into<String>, level: u8, buf: Vec<u8>) -> Self {
        Self {
            chunk_type: chunk_type.into(),
            level,
            buf,
        }
    }

    /// A zero-length chunk; the content behind [`Key::Empty`].
    pub fn empty(chunk_type: impl Into<String>, level: u8) -> Self {
        Self::new(chunk_type, level, Vec::new())
    }

    /// Compute the content-addressed key for this chunk.
    ///
    /// # Panics
    ///
    /// Panics if the type tag fails [`check_type`]. Stores check the tag
    /// before hashing.
    pub fn compute_key(&self) -> Key {
        ChunkHasher::new(&self.chunk_type).hash(&self.buf, self.level)
    }

    /// Number of stored bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the chunk holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Reject type tags that cannot be folded into a chunk hash.
pub fn check_type(chunk_type: &str) -> StoreResult<()> {
    if ChunkHasher::try_new(chunk_type).is_none() {
        return Err(StoreError::TypeTooLong {
            chunk_type: chunk_type.to_string(),
            max: MAX_TYPE_LEN,
        });
    }
    Ok(())
}
