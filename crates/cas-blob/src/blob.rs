//! The hash-tree blob.
//!
//! Leaf chunks hold `chunk_size` bytes of content. A pointer chunk at level
//! `n > 0` holds `fanout` child keys for level `n - 1`. The tree height is a
//! pure function of the blob size, so the manifest does not record it:
//!
//! ```text
//! height(0)    = 0
//! height(size) = number of divisions by fanout that take
//!                (size - 1) / chunk_size to zero
//! ```
//!
//! A leaf index is turned into a path of slot indices by repeated
//! `mod fanout` / `div fanout`, collected bottom-up and followed top-down.

use std::borrow::Cow;

use tracing::{debug, warn};

use cas_store::{Chunk, ChunkStore};
use cas_types::{Key, KEY_SIZE};

use crate::cursor::BlobCursor;
use crate::error::{BlobError, BlobResult};
use crate::manifest::{Manifest, Tuning};
use crate::stash::Stash;

/// Result of a positional read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes placed at the front of the caller's buffer.
    pub len: usize,
    /// The read reached the end of the blob: either it started at or past
    /// the size, or it was cut short by it.
    pub eof: bool,
}

/// The most recently fetched durable leaf.
///
/// Durable chunks never change, so a cached leaf stays valid until a write
/// replaces it with a private copy. Writers must [`clear`](LeafCache::clear)
/// it.
#[derive(Debug, Default)]
pub(crate) struct LeafCache {
    entry: Option<(u64, Chunk)>,
}

impl LeafCache {
    fn get(&self, leaf: u64) -> Option<&Chunk> {
        match &self.entry {
            Some((cached, chunk)) if *cached == leaf => Some(chunk),
            _ => None,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entry = None;
    }
}

/// A sparse byte sequence backed by a hash tree of chunks.
///
/// A blob is opened from a [`Manifest`]. Writes stage copies of the touched
/// chunks in a [`Stash`]. [`Blob::save`] persists them, and the blob stays
/// usable afterwards.
pub struct Blob<S> {
    stash: Stash<S>,
    manifest: Manifest,
}

impl<S: ChunkStore> Blob<S> {
    /// Open a blob described by `manifest` on top of `store`.
    pub fn open(store: S, manifest: Manifest) -> BlobResult<Self> {
        manifest.validate()?;
        Ok(Self {
            stash: Stash::new(store),
            manifest,
        })
    }

    /// The current manifest. Its root may be a Private key until the next
    /// [`save`](Blob::save).
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Logical length in bytes.
    pub fn size(&self) -> u64 {
        self.manifest.size
    }

    pub fn chunk_type(&self) -> &str {
        &self.manifest.chunk_type
    }

    pub fn tuning(&self) -> Tuning {
        self.manifest.tuning()
    }

    /// Number of pointer levels above the leaves.
    pub fn height(&self) -> u8 {
        if self.manifest.size == 0 {
            return 0;
        }
        self.levels_for_leaf((self.manifest.size - 1) / self.chunk_size())
    }

    /// The staging area holding this blob's unsaved chunks.
    pub fn stash(&self) -> &Stash<S> {
        &self.stash
    }

    /// A `std::io` view of the blob starting at offset 0.
    pub fn cursor(&mut self) -> BlobCursor<'_, S> {
        BlobCursor::new(self)
    }

    // ---------------------------------------------------------------
    // Addressing
    // ---------------------------------------------------------------

    fn chunk_size(&self) -> u64 {
        u64::from(self.manifest.chunk_size)
    }

    fn chunk_len(&self, level: u8) -> usize {
        if level == 0 {
            self.manifest.chunk_size as usize
        } else {
            self.manifest.fanout as usize * KEY_SIZE
        }
    }

    fn levels_for_leaf(&self, leaf: u64) -> u8 {
        let fanout = u64::from(self.manifest.fanout);
        let mut index = leaf;
        let mut levels = 0;
        while index > 0 {
            index /= fanout;
            levels += 1;
        }
        levels
    }

    /// Slot indices leading from a root at `height` down to `leaf`.
    fn slot_path(&self, leaf: u64, height: u8) -> Vec<usize> {
        let fanout = u64::from(self.manifest.fanout);
        let mut index = leaf;
        let mut path = Vec::with_capacity(usize::from(height));
        for _ in 0..height {
            path.push((index % fanout) as usize);
            index /= fanout;
        }
        debug_assert_eq!(index, 0, "leaf {leaf} lies outside a tree of height {height}");
        path.reverse();
        path
    }

    // ---------------------------------------------------------------
    // Read
    // ---------------------------------------------------------------

    /// Read into `buf` starting at `offset`.
    ///
    /// The request is clipped to the blob size. Regions that were never
    /// written read as zeros.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> BlobResult<ReadOutcome> {
        self.read_cached(buf, offset, &mut LeafCache::default())
    }

    /// [`read_at`](Blob::read_at), reusing `cache` for a leaf fetched by an
    /// earlier call and refilling it on a miss.
    pub(crate) fn read_cached(
        &self,
        buf: &mut [u8],
        offset: u64,
        cache: &mut LeafCache,
    ) -> BlobResult<ReadOutcome> {
        let size = self.manifest.size;
        if offset >= size {
            return Ok(ReadOutcome { len: 0, eof: true });
        }
        let available = size - offset;
        let (want, eof) = if buf.len() as u64 > available {
            (available as usize, true)
        } else {
            (buf.len(), false)
        };

        let chunk_size = self.chunk_size();
        let mut done = 0;
        while done < want {
            let pos = offset + done as u64;
            let within = (pos % chunk_size) as usize;
            let n = (want - done).min(chunk_size as usize - within);

            let index = pos / chunk_size;
            let dst = &mut buf[done..done + n];
            if let Some(chunk) = cache.get(index) {
                fill_from(dst, &chunk.buf, within);
            } else {
                match self.leaf_for_read(index)? {
                    Cow::Borrowed(chunk) => fill_from(dst, &chunk.buf, within),
                    Cow::Owned(chunk) => {
                        fill_from(dst, &chunk.buf, within);
                        cache.entry = Some((index, chunk));
                    }
                }
            }

            done += n;
        }
        Ok(ReadOutcome { len: want, eof })
    }

    fn leaf_for_read(&self, leaf: u64) -> BlobResult<Cow<'_, Chunk>> {
        let chunk_type = &self.manifest.chunk_type;
        let height = self.height();
        let mut key = self.manifest.root;
        let mut level = height;
        for slot in self.slot_path(leaf, height) {
            let chunk = self.stash.get(&key, chunk_type, level)?;
            key = child_key(&key, &chunk.buf, slot, level)?;
            level -= 1;
        }
        Ok(self.stash.get(&key, chunk_type, 0)?)
    }

    // ---------------------------------------------------------------
    // Write
    // ---------------------------------------------------------------

    /// Write all of `buf` at `offset`, growing the blob if needed.
    ///
    /// The size only ever grows. Writing past the end leaves a zero-filled
    /// gap that costs no storage.
    pub fn write_at(&mut self, buf: &[u8], offset: u64) -> BlobResult<usize> {
        if offset.checked_add(buf.len() as u64).is_none() {
            return Err(BlobError::OffsetOverflow {
                offset,
                len: buf.len() as u64,
            });
        }

        let chunk_size = self.chunk_size();
        let mut done = 0;
        while done < buf.len() {
            let pos = offset + done as u64;
            let within = (pos % chunk_size) as usize;
            let n = (buf.len() - done).min(chunk_size as usize - within);

            let leaf = self.writable_leaf(pos / chunk_size)?;
            let chunk = self.stash.get_mut(&leaf, &self.manifest.chunk_type, 0)?;
            debug_assert_eq!(chunk.buf.len(), chunk_size as usize);
            chunk.buf[within..within + n].copy_from_slice(&buf[done..done + n]);

            done += n;
            let end = pos + n as u64;
            if end > self.manifest.size {
                self.manifest.size = end;
            }
        }
        Ok(buf.len())
    }

    /// Private key of the leaf at index `leaf`, privatizing every chunk on
    /// the path to it.
    fn writable_leaf(&mut self, leaf: u64) -> BlobResult<Key> {
        let chunk_type = self.manifest.chunk_type.clone();
        let pointer_len = self.chunk_len(1);
        let needed = self.levels_for_leaf(leaf);
        let mut height = self.height();

        // Grow upward. The root is replaced before the size catches up, so a
        // failure later in this write can leave the tree one level taller
        // than the size implies. Size stays authoritative for addressing.
        while height < needed {
            height += 1;
            let grown = self.privatize(&Key::Empty, &chunk_type, height)?;
            let old_root = self.manifest.root.to_bytes();
            self.stash.get_mut(&grown, &chunk_type, height)?.buf[..KEY_SIZE]
                .copy_from_slice(&old_root);
            self.manifest.root = grown;
            debug!(height, "blob tree grew");
        }

        let current = self.manifest.root;
        let root = self.privatize(&current, &chunk_type, height)?;
        self.manifest.root = root;

        let mut parent = root;
        let mut level = height;
        for slot in self.slot_path(leaf, height) {
            let child = {
                let chunk = self.stash.get(&parent, &chunk_type, level)?;
                debug_assert_eq!(chunk.buf.len(), pointer_len);
                child_key(&parent, &chunk.buf, slot, level)?
            };
            let child = self.privatize(&child, &chunk_type, level - 1)?;
            self.stash.get_mut(&parent, &chunk_type, level)?.buf
                [slot * KEY_SIZE..(slot + 1) * KEY_SIZE]
                .copy_from_slice(&child.to_bytes());

            parent = child;
            level -= 1;
        }
        debug_assert_eq!(level, 0);
        Ok(parent)
    }

    /// Stage a size-correct private copy of a chunk.
    ///
    /// A pointer chunk coming from the store has every slot checked on the
    /// way in: once private, its slots are trusted to hold Private keys.
    fn privatize(&mut self, key: &Key, chunk_type: &str, level: u8) -> BlobResult<Key> {
        let len = self.chunk_len(level);
        let private = self.stash.clone_chunk(key, chunk_type, level, len)?;
        if level > 0 && !key.is_private() {
            let chunk = self.stash.get(&private, chunk_type, level)?;
            for slot in 0..self.manifest.fanout as usize {
                child_key(key, &chunk.buf, slot, level)?;
            }
        }
        Ok(private)
    }

    // ---------------------------------------------------------------
    // Save
    // ---------------------------------------------------------------

    /// Persist every staged chunk and return the resulting manifest.
    ///
    /// Subtrees that were not edited are already durable and are skipped.
    /// The blob remains open; later writes privatize chunks again as needed.
    pub fn save(&mut self) -> BlobResult<Manifest> {
        let root = self.persist(self.manifest.root, self.height())?;
        self.manifest.root = root;
        debug!(
            chunk_type = %self.manifest.chunk_type,
            root = %root.short_hex(),
            size = self.manifest.size,
            "blob saved"
        );
        Ok(self.manifest.clone())
    }

    fn persist(&mut self, key: Key, level: u8) -> BlobResult<Key> {
        if !key.is_private() {
            return Ok(key);
        }
        let chunk_type = self.manifest.chunk_type.clone();

        if level > 0 {
            for slot in 0..self.manifest.fanout as usize {
                let child = {
                    let chunk = self.stash.get(&key, &chunk_type, level)?;
                    child_key(&key, &chunk.buf, slot, level)?
                };
                if !child.is_private() {
                    continue;
                }
                let saved = self.persist(child, level - 1)?;
                self.stash.get_mut(&key, &chunk_type, level)?.buf
                    [slot * KEY_SIZE..(slot + 1) * KEY_SIZE]
                    .copy_from_slice(&saved.to_bytes());
            }
        }

        trim_zeros(&mut self.stash.get_mut(&key, &chunk_type, level)?.buf);
        Ok(self.stash.save(&key, &chunk_type, level)?)
    }
}

/// Decode the child key in `slot` of a pointer chunk.
///
/// Slots past the end of a trimmed buffer read as [`Key::Empty`]. Private
/// keys are only legitimate inside a private parent; anywhere else they, and
/// Invalid keys, mean the stored tree is corrupt.
fn child_key(parent: &Key, buf: &[u8], slot: usize, level: u8) -> BlobResult<Key> {
    let start = slot * KEY_SIZE;
    let mut raw = [0u8; KEY_SIZE];
    if start < buf.len() {
        let end = buf.len().min(start + KEY_SIZE);
        raw[..end - start].copy_from_slice(&buf[start..end]);
    }
    let decoded = if parent.is_private() {
        Key::from_bytes_private(&raw)
    } else {
        Key::from_bytes(&raw)
    };
    let key = decoded.unwrap_or(Key::Invalid);
    if key.is_invalid() {
        warn!(level, slot, parent = ?parent, "reserved key in pointer chunk");
        return Err(BlobError::Corrupt { level, slot, key });
    }
    Ok(key)
}

/// Copy leaf bytes from `within` into `dst`, zero-filling past the stored end.
fn fill_from(dst: &mut [u8], stored: &[u8], within: usize) {
    let stored = stored.get(within..).unwrap_or(&[]);
    let copied = stored.len().min(dst.len());
    dst[..copied].copy_from_slice(&stored[..copied]);
    dst[copied..].fill(0);
}

fn trim_zeros(buf: &mut Vec<u8>) {
    let len = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    buf.truncate(len);
}

impl<S> std::fmt::Debug for Blob<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("manifest", &self.manifest)
            .field("stash", &self.stash)
            .finish()
    }
}
