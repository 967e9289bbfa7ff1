use std::sync::Arc;

use cas_types::Key;

use crate::chunk::Chunk;
use crate::error::StoreResult;

/// Content-addressed chunk store.
///
/// All implementations must satisfy these invariants:
/// - Chunks are addressed by `(key, type, level)`, not by key alone. The same
///   bytes under a different type or level are a different entry.
/// - `add` is deterministic: identical `(type, level, bytes)` always returns
///   the same key, and adding existing content is a no-op.
/// - `get(Key::Empty, ..)` returns an empty chunk of the requested type and
///   level without consulting the backend.
/// - Private and Invalid keys are never found.
/// - Type tags longer than [`MAX_TYPE_LEN`](cas_crypto::MAX_TYPE_LEN) bytes
///   are refused with [`StoreError::TypeTooLong`](crate::StoreError::TypeTooLong).
/// - All I/O errors are propagated, never silently ignored.
pub trait ChunkStore: Send + Sync {
    /// Read a chunk by key, type and level.
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if the
    /// chunk does not exist.
    fn get(&self, key: &Key, chunk_type: &str, level: u8) -> StoreResult<Chunk>;

    /// Store a chunk and return its content-addressed key.
    fn add(&self, chunk: &Chunk) -> StoreResult<Key>;
}

impl<T: ChunkStore + ?Sized> ChunkStore for &T {
    fn get(&self, key: &Key, chunk_type: &str, level: u8) -> StoreResult<Chunk> {
        (**self).get(key, chunk_type, level)
    }

    fn add(&self, chunk: &Chunk) -> StoreResult<Key> {
        (**self).add(chunk)
    }
}

impl<T: ChunkStore + ?Sized> ChunkStore for Arc<T> {
    fn get(&self, key: &Key, chunk_type: &str, level: u8) -> StoreResult<Chunk> {
        (**self).get(key, chunk_type, level)
    }

    fn add(&self, chunk: &Chunk) -> StoreResult<Key> {
        (**self).add(chunk)
    }
}
