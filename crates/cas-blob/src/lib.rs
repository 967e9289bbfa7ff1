//! Hash-tree blobs over a content-addressed chunk store.
//!
//! A [`Blob`] presents an arbitrarily large, sparse byte sequence with
//! positional reads and writes. Content is cut into fixed-size leaf chunks;
//! pointer chunks of `fanout` keys sit above them, and the whole tree is named
//! by a single root [`Key`](cas_types::Key) recorded in a [`Manifest`].
//!
//! Edits never touch stored chunks. The [`Stash`] copies every chunk on the
//! path to an edited leaf into a private, in-memory buffer addressed by a
//! Private key; [`Blob::save`] later hashes the dirty subtree bottom-up into
//! the store and returns a new durable manifest.
//!
//! Trailing zero bytes are trimmed before a chunk is stored and implied when
//! it is read back, so unwritten regions and untouched subtrees cost nothing.
//!
//! # Concurrency
//!
//! A blob has a single owner. Mutating operations take `&mut self`; there is
//! no internal locking. Several blobs may share one store.

pub mod blob;
pub mod cursor;
pub mod error;
pub mod idpool;
pub mod manifest;
pub mod stash;

pub use blob::{Blob, ReadOutcome};
pub use cursor::BlobCursor;
pub use error::{BlobError, BlobResult, ConfigError};
pub use idpool::IdPool;
pub use manifest::{
    Manifest, Tuning, DEFAULT_CHUNK_SIZE, DEFAULT_FANOUT, MIN_CHUNK_SIZE, MIN_FANOUT,
};
pub use stash::Stash;
