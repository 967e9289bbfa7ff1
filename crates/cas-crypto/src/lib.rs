//! Cryptographic primitives for the content-addressed blob engine.
//!
//! Provides the chunk hasher that turns `(bytes, type, level)` into a
//! [`Key`](cas_types::Key). All crypto operations wrap established
//! libraries -- no custom cryptography.

pub mod hasher;

pub use hasher::{ChunkHasher, MAX_TYPE_LEN};
