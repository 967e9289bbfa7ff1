use cas_types::Key;

/// Errors from chunk store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested chunk was not found.
    #[error("chunk not found: {chunk_type}@{level} {key:?}")]
    NotFound {
        chunk_type: String,
        level: u8,
        key: Key,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The type tag is too long to be folded into a chunk hash.
    #[error("chunk type {chunk_type:?} is longer than {max} bytes")]
    TypeTooLong { chunk_type: String, max: usize },

    /// A stored chunk does not hash to the key it is filed under.
    #[error("corrupt chunk {key:?}: {reason}")]
    CorruptChunk { key: Key, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
