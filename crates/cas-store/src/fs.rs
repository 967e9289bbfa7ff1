use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use cas_crypto::ChunkHasher;
use cas_types::Key;

use crate::chunk::{check_type, Chunk};
use crate::error::{StoreError, StoreResult};
use crate::traits::ChunkStore;

/// Configuration for a directory-backed chunk store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FsStoreConfig {
    /// Directory holding the chunk files.
    pub root: PathBuf,
    /// `fsync` each chunk file before it is renamed into place.
    pub sync: bool,
    /// Re-hash chunk bytes on every read and reject mismatches.
    pub verify_on_read: bool,
}

impl Default for FsStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("chunks"),
            sync: false,
            verify_on_read: true,
        }
    }
}

impl FsStoreConfig {
    /// Default settings rooted at `root`.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }
}

/// Chunk store keeping one file per chunk.
///
/// Layout:
/// ```text
/// <root>/<hex(type)>/<level>/<key-hex>
/// ```
///
/// Files are written to a temporary file in the target directory and renamed
/// into place, so a reader never observes a partially written chunk.
#[derive(Debug)]
pub struct FsChunkStore {
    config: FsStoreConfig,
}

impl FsChunkStore {
    /// Open (or create) a store at the configured root.
    pub fn open(config: FsStoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.root)?;
        Ok(Self { config })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn path_for(&self, key: &Key, chunk_type: &str, level: u8) -> PathBuf {
        self.config
            .root
            .join(hex::encode(chunk_type))
            .join(level.to_string())
            .join(key.to_hex())
    }

    fn not_found(key: &Key, chunk_type: &str, level: u8) -> StoreError {
        StoreError::NotFound {
            chunk_type: chunk_type.to_string(),
            level,
            key: *key,
        }
    }
}

impl ChunkStore for FsChunkStore {
    fn get(&self, key: &Key, chunk_type: &str, level: u8) -> StoreResult<Chunk> {
        check_type(chunk_type)?;
        if key.is_empty() {
            return Ok(Chunk::empty(chunk_type, level));
        }
        if !key.is_content() {
            return Err(Self::not_found(key, chunk_type, level));
        }

        let buf = match fs::read(self.path_for(key, chunk_type, level)) {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Self::not_found(key, chunk_type, level));
            }
            Err(e) => return Err(e.into()),
        };

        if self.config.verify_on_read && !ChunkHasher::new(chunk_type).verify(&buf, level, key) {
            warn!(key = %key.short_hex(), chunk_type, level, "chunk hash mismatch");
            return Err(StoreError::CorruptChunk {
                key: *key,
                reason: format!("{} bytes do not hash to the key", buf.len()),
            });
        }
        Ok(Chunk::new(chunk_type, level, buf))
    }

    fn add(&self, chunk: &Chunk) -> StoreResult<Key> {
        check_type(&chunk.chunk_type)?;
        let key = chunk.compute_key();
        if key.is_empty() {
            return Ok(key);
        }

        let path = self.path_for(&key, &chunk.chunk_type, chunk.level);
        if path.exists() {
            return Ok(key);
        }
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "chunk path has no parent"))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&chunk.buf)?;
        if self.config.sync {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(
            key = %key.short_hex(),
            chunk_type = %chunk.chunk_type,
            level = chunk.level,
            len = chunk.buf.len(),
            "chunk written"
        );
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, FsChunkStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChunkStore::open(FsStoreConfig::at(dir.path().join("chunks"))).unwrap();
        (dir, store)
    }

    #[test]
    fn add_and_get() {
        let (_dir, store) = temp_store();
        let chunk = Chunk::new("blob", 0, b"on disk".to_vec());
        let key = store.add(&chunk).unwrap();
        assert_eq!(store.get(&key, "blob", 0).unwrap(), chunk);
    }

    #[test]
    fn layout_uses_hex_type_and_level() {
        let (_dir, store) = temp_store();
        let key = store.add(&Chunk::new("a/b", 2, b"ptr".to_vec())).unwrap();
        let expected = store
            .root()
            .join(hex::encode("a/b"))
            .join("2")
            .join(key.to_hex());
        assert!(expected.is_file());
    }

    #[test]
    fn add_is_idempotent() {
        let (_dir, store) = temp_store();
        let chunk = Chunk::new("blob", 0, b"twice".to_vec());
        assert_eq!(store.add(&chunk).unwrap(), store.add(&chunk).unwrap());
    }

    #[test]
    fn missing_chunk_is_not_found() {
        let (_dir, store) = temp_store();
        let key = Chunk::new("blob", 0, b"absent".to_vec()).compute_key();
        assert!(matches!(
            store.get(&key, "blob", 0),
            Err(StoreError::NotFound { level: 0, .. })
        ));
        assert!(matches!(
            store.get(&Key::private(0), "blob", 0),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn empty_chunk_never_touches_disk() {
        let (_dir, store) = temp_store();
        assert_eq!(store.add(&Chunk::empty("blob", 0)).unwrap(), Key::Empty);
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
        assert!(store.get(&Key::Empty, "blob", 0).unwrap().is_empty());
    }

    #[test]
    fn tampered_chunk_is_corrupt() {
        let (_dir, store) = temp_store();
        let key = store.add(&Chunk::new("blob", 0, b"original".to_vec())).unwrap();
        fs::write(store.path_for(&key, "blob", 0), b"tampered").unwrap();
        assert!(matches!(
            store.get(&key, "blob", 0),
            Err(StoreError::CorruptChunk { .. })
        ));
    }

    #[test]
    fn overlong_type_never_reaches_disk() {
        let (_dir, store) = temp_store();
        let chunk = Chunk::new("x".repeat(200), 0, b"data".to_vec());
        assert!(matches!(
            store.add(&chunk),
            Err(StoreError::TypeTooLong { max: 12, .. })
        ));
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = FsStoreConfig::at("/var/lib/cas");
        let json = serde_json::to_string(&config).unwrap();
        let parsed: FsStoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.root, PathBuf::from("/var/lib/cas"));
        assert!(parsed.verify_on_read);
        assert!(!parsed.sync);
    }
}
