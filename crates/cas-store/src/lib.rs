//! Content-addressed chunk storage.
//!
//! A chunk store maps `(key, type, level)` to immutable chunk bytes, where the
//! key is the [`ChunkHasher`](cas_crypto::ChunkHasher) digest of exactly that
//! triple. The blob engine only ever talks to a store through the
//! [`ChunkStore`] trait.
//!
//! # Storage Backends
//!
//! - [`InMemoryChunkStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsChunkStore`] -- one file per chunk under a root directory
//!
//! # Design Rules
//!
//! 1. Chunks are immutable once written (content-addressing guarantees this).
//! 2. Identical `(type, level, bytes)` always yields the same key; adding it
//!    again is a no-op.
//! 3. The [`Key::Empty`](cas_types::Key::Empty) key names the empty chunk of
//!    every type and level and never touches the backend.
//! 4. Private and Invalid keys never name stored content.
//! 5. Type tags longer than [`MAX_TYPE_LEN`](cas_crypto::MAX_TYPE_LEN)
//!    bytes are refused with [`StoreError::TypeTooLong`].
//! 6. All I/O errors are propagated, never silently ignored.

pub mod chunk;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use chunk::{check_type, Chunk};
pub use error::{StoreError, StoreResult};
pub use fs::{FsChunkStore, FsStoreConfig};
pub use memory::InMemoryChunkStore;
pub use traits::ChunkStore;
