use serde::{Deserialize, Serialize};

use cas_crypto::MAX_TYPE_LEN;
use cas_types::Key;

use crate::error::ConfigError;

/// Default leaf chunk size: 4 MiB.
pub const DEFAULT_CHUNK_SIZE: u32 = 4 * 1024 * 1024;
/// Default number of child slots per pointer chunk.
pub const DEFAULT_FANOUT: u32 = 64;
/// Smallest accepted leaf chunk size.
pub const MIN_CHUNK_SIZE: u32 = 4096;
/// Smallest accepted fanout.
pub const MIN_FANOUT: u32 = 2;

/// Shape parameters of a blob's hash tree. Fixed for the blob's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tuning {
    /// Bytes per leaf chunk.
    pub chunk_size: u32,
    /// Child slots per pointer chunk.
    pub fanout: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            fanout: DEFAULT_FANOUT,
        }
    }
}

impl Tuning {
    pub fn new(chunk_size: u32, fanout: u32) -> Self {
        Self { chunk_size, fanout }
    }

    /// Check the tuning against the supported minimums.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::ChunkSizeTooSmall {
                actual: self.chunk_size,
                min: MIN_CHUNK_SIZE,
            });
        }
        if self.fanout < MIN_FANOUT {
            return Err(ConfigError::FanoutTooSmall {
                actual: self.fanout,
                min: MIN_FANOUT,
            });
        }
        Ok(())
    }
}

/// The persisted description of a blob.
///
/// Higher layers store manifests and hand them back to [`Blob::open`]. The
/// root key is serialized as hex.
///
/// [`Blob::open`]: crate::Blob::open
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Type tag folded into every chunk hash of this blob.
    #[serde(rename = "type")]
    pub chunk_type: String,
    /// Key of the top chunk of the tree.
    pub root: Key,
    /// Logical length in bytes.
    pub size: u64,
    /// Bytes per leaf chunk.
    pub chunk_size: u32,
    /// Child slots per pointer chunk.
    pub fanout: u32,
}

impl Manifest {
    /// An empty blob of the given type with default tuning.
    pub fn new(chunk_type: impl Into<String>) -> Self {
        Self::with_tuning(chunk_type, Tuning::default())
    }

    /// An empty blob of the given type and tuning.
    pub fn with_tuning(chunk_type: impl Into<String>, tuning: Tuning) -> Self {
        Self {
            chunk_type: chunk_type.into(),
            root: Key::Empty,
            size: 0,
            chunk_size: tuning.chunk_size,
            fanout: tuning.fanout,
        }
    }

    pub fn tuning(&self) -> Tuning {
        Tuning::new(self.chunk_size, self.fanout)
    }

    /// Check that the manifest can back a blob.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_type.is_empty() {
            return Err(ConfigError::MissingType);
        }
        if self.chunk_type.len() > MAX_TYPE_LEN {
            return Err(ConfigError::TypeTooLong {
                actual: self.chunk_type.len(),
                max: MAX_TYPE_LEN,
            });
        }
        self.tuning().validate()?;
        if self.root.is_private() || self.root.is_invalid() {
            return Err(ConfigError::UnusableRoot(self.root));
        }
        Ok(())
    }
}
