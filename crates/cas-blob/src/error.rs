//! Error types for blob operations.

use cas_store::StoreError;
use cas_types::Key;

/// Problems with a manifest that make it unusable for opening a blob.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The manifest has no type tag.
    #[error("manifest is missing a type")]
    MissingType,

    /// The type tag does not fit in the chunk hash personalization.
    #[error("type tag is {actual} bytes, the maximum is {max}")]
    TypeTooLong { actual: usize, max: usize },

    /// The chunk size is below the supported minimum.
    #[error("chunk size {actual} is below the minimum of {min}")]
    ChunkSizeTooSmall { actual: u32, min: u32 },

    /// The fanout is below the supported minimum.
    #[error("fanout {actual} is below the minimum of {min}")]
    FanoutTooSmall { actual: u32, min: u32 },

    /// The root key is a sentinel that cannot name persisted content.
    #[error("manifest root {0:?} does not name persisted content")]
    UnusableRoot(Key),
}

/// Errors that can occur during blob operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The manifest failed validation.
    #[error("invalid manifest: {0}")]
    Config(#[from] ConfigError),

    /// The backing store or the stash failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A pointer chunk holds a reserved-range key where a child key belongs.
    #[error("corrupt pointer chunk: slot {slot} at level {level} holds {key:?}")]
    Corrupt {
        /// Level of the pointer chunk.
        level: u8,
        /// Slot index within the pointer chunk.
        slot: usize,
        /// The decoded key.
        key: Key,
    },

    /// A seek resolved to a position before the start of the blob.
    #[error("negative offset: {base} {delta:+}")]
    NegativeOffset {
        /// Position the seek was relative to.
        base: u64,
        /// Requested displacement.
        delta: i64,
    },

    /// An offset plus a length does not fit in `u64`.
    #[error("offset overflow: {offset} + {len}")]
    OffsetOverflow {
        /// Starting offset.
        offset: u64,
        /// Length added to it.
        len: u64,
    },
}

/// Convenience alias for blob results.
pub type BlobResult<T> = Result<T, BlobError>;
