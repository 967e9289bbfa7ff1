//! Copy-on-write staging in front of a chunk store.
//!
//! Stored chunks are immutable. To edit one, the [`Stash`] copies it into a
//! private buffer and hands out a Private key for it; callers then mutate the
//! buffer in place through [`Stash::get_mut`]. [`Stash::save`] pushes a
//! private buffer into the store and releases its id.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::debug;

use cas_store::{Chunk, ChunkStore, StoreError, StoreResult};
use cas_types::Key;

use crate::idpool::IdPool;

/// Per-blob staging area for uncommitted chunks.
///
/// Private buffers live until they are saved or the stash is dropped; there is
/// no rollback.
pub struct Stash<S> {
    store: S,
    ids: IdPool,
    local: HashMap<u64, Chunk>,
}

impl<S: ChunkStore> Stash<S> {
    /// Create an empty stash over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            ids: IdPool::new(),
            local: HashMap::new(),
        }
    }

    /// Number of private chunks currently staged.
    pub fn live(&self) -> usize {
        self.local.len()
    }

    /// Read a chunk.
    ///
    /// Private keys resolve to the live staged buffer; anything else is read
    /// from the backing store. [`Key::Empty`] yields an empty chunk without
    /// consulting the store.
    pub fn get(&self, key: &Key, chunk_type: &str, level: u8) -> StoreResult<Cow<'_, Chunk>> {
        match key {
            Key::Private(id) => self
                .local
                .get(id)
                .map(Cow::Borrowed)
                .ok_or_else(|| not_found(key, chunk_type, level)),
            Key::Empty => Ok(Cow::Owned(Chunk::empty(chunk_type, level))),
            _ => self.store.get(key, chunk_type, level).map(Cow::Owned),
        }
    }

    /// The live buffer behind a Private key.
    pub fn get_mut(&mut self, key: &Key, chunk_type: &str, level: u8) -> StoreResult<&mut Chunk> {
        let found = match key {
            Key::Private(id) => self.local.get_mut(id),
            _ => None,
        };
        found.ok_or_else(|| not_found(key, chunk_type, level))
    }

    /// Make a chunk writable and return its Private key.
    ///
    /// A key that is already private is returned unchanged, so repeated edits
    /// do not copy again. Otherwise the chunk is fetched and copied into a
    /// buffer of exactly `size` bytes, zero-extended or truncated as needed.
    pub fn clone_chunk(
        &mut self,
        key: &Key,
        chunk_type: &str,
        level: u8,
        size: usize,
    ) -> StoreResult<Key> {
        if key.is_private() {
            return Ok(*key);
        }
        let mut chunk = self.get(key, chunk_type, level)?.into_owned();
        chunk.buf.resize(size, 0);

        let id = self.ids.get();
        self.local.insert(id, chunk);
        Ok(Key::private(id))
    }

    /// Persist a private chunk and return its durable key.
    ///
    /// Keys that are not private are already durable and come back unchanged.
    pub fn save(&mut self, key: &Key, chunk_type: &str, level: u8) -> StoreResult<Key> {
        let Some(id) = key.private_id() else {
            return Ok(*key);
        };
        let chunk = self
            .local
            .get(&id)
            .ok_or_else(|| not_found(key, chunk_type, level))?;
        let saved = self.store.add(chunk)?;
        debug!(
            id,
            key = %saved.short_hex(),
            level = chunk.level,
            len = chunk.buf.len(),
            "stash flushed chunk"
        );

        self.local.remove(&id);
        self.ids.put(id);
        Ok(saved)
    }
}

fn not_found(key: &Key, chunk_type: &str, level: u8) -> StoreError {
    StoreError::NotFound {
        chunk_type: chunk_type.to_string(),
        level,
        key: *key,
    }
}

impl<S> std::fmt::Debug for Stash<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stash")
            .field("live", &self.local.len())
            .finish()
    }
}
