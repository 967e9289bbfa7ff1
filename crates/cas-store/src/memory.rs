use std::collections::HashMap;
use std::sync::RwLock;

use cas_types::Key;

use crate::chunk::{check_type, Chunk};
use crate::error::{StoreError, StoreResult};
use crate::traits::ChunkStore;

type Address = (Key, String, u8);

/// In-memory, HashMap-based chunk store.
///
/// Intended for tests and embedding. All chunks are held in memory behind a
/// `RwLock` for safe concurrent access. Chunk bytes are cloned on read/write.
pub struct InMemoryChunkStore {
    chunks: RwLock<HashMap<Address, Vec<u8>>>,
}

impl InMemoryChunkStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of chunks currently stored.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored chunks.
    pub fn total_bytes(&self) -> u64 {
        self.chunks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|buf| buf.len() as u64)
            .sum()
    }

    /// Whether a chunk is stored under the given address.
    pub fn contains(&self, key: &Key, chunk_type: &str, level: u8) -> bool {
        self.chunks
            .read()
            .expect("lock poisoned")
            .contains_key(&(*key, chunk_type.to_string(), level))
    }
}

impl Default for InMemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for InMemoryChunkStore {
    fn get(&self, key: &Key, chunk_type: &str, level: u8) -> StoreResult<Chunk> {
        check_type(chunk_type)?;
        if key.is_empty() {
            return Ok(Chunk::empty(chunk_type, level));
        }
        let map = self.chunks.read().expect("lock poisoned");
        map.get(&(*key, chunk_type.to_string(), level))
            .map(|buf| Chunk::new(chunk_type, level, buf.clone()))
            .ok_or_else(|| StoreError::NotFound {
                chunk_type: chunk_type.to_string(),
                level,
                key: *key,
            })
    }

    fn add(&self, chunk: &Chunk) -> StoreResult<Key> {
        check_type(&chunk.chunk_type)?;
        let key = chunk.compute_key();
        if key.is_empty() {
            return Ok(key);
        }
        let mut map = self.chunks.write().expect("lock poisoned");
        // Idempotent: content-addressing guarantees the same address always
        // maps to the same bytes.
        map.entry((key, chunk.chunk_type.clone(), chunk.level))
            .or_insert_with(|| chunk.buf.clone());
        Ok(key)
    }
}

impl std::fmt::Debug for InMemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryChunkStore")
            .field("chunk_count", &count)
            .finish()
    }
}
