use std::io::{self, Read, Seek, SeekFrom, Write};

use cas_store::ChunkStore;

use crate::blob::{Blob, LeafCache};
use crate::error::BlobError;

/// `std::io` adapter over a [`Blob`] with its own position.
///
/// `flush` is a no-op. Call [`Blob::save`] to persist. Seeking past the end is
/// allowed and a later write there leaves a zero-filled gap.
///
/// The last leaf read from the store is kept, so small sequential reads
/// fetch each leaf once.
pub struct BlobCursor<'a, S> {
    blob: &'a mut Blob<S>,
    pos: u64,
    leaf: LeafCache,
}

impl<'a, S: ChunkStore> BlobCursor<'a, S> {
    pub fn new(blob: &'a mut Blob<S>) -> Self {
        Self {
            blob,
            pos: 0,
            leaf: LeafCache::default(),
        }
    }

    /// Current position in bytes.
    pub fn position(&self) -> u64 {
        self.pos
    }
}

fn into_io(err: BlobError) -> io::Error {
    match err {
        BlobError::NegativeOffset { .. } | BlobError::OffsetOverflow { .. } => {
            io::Error::new(io::ErrorKind::InvalidInput, err)
        }
        other => io::Error::other(other),
    }
}

impl<S: ChunkStore> Read for BlobCursor<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let outcome = self
            .blob
            .read_cached(buf, self.pos, &mut self.leaf)
            .map_err(into_io)?;
        self.pos += outcome.len as u64;
        Ok(outcome.len)
    }
}

impl<S: ChunkStore> Write for BlobCursor<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.leaf.clear();
        let n = self.blob.write_at(buf, self.pos).map_err(into_io)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: ChunkStore> Seek for BlobCursor<'_, S> {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match target {
            SeekFrom::Start(offset) => (offset, 0),
            SeekFrom::End(delta) => (self.blob.size(), delta),
            SeekFrom::Current(delta) => (self.pos, delta),
        };
        let pos = match base.checked_add_signed(delta) {
            Some(pos) => pos,
            None if delta < 0 => return Err(into_io(BlobError::NegativeOffset { base, delta })),
            None => {
                return Err(into_io(BlobError::OffsetOverflow {
                    offset: base,
                    len: delta.unsigned_abs(),
                }))
            }
        };
        self.pos = pos;
        Ok(pos)
    }
}
