//! Binary vector segment file.
//!
//! Stores a collection's embeddings in a simple binary format read back
//! through a memory map:
//! - Header (16 bytes): magic, format version, dimension, entry count
//! - Entries: document id (u32) followed by the vector as little-endian f32s
//!
//! Writes always go through a temporary file renamed over the previous
//! segment, so a crash mid-write leaves the old segment intact.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;

use crate::store::{StoreError, StoreResult};
use crate::types::DocumentId;

/// Magic bytes identifying a lectern vector segment.
const MAGIC_BYTES: &[u8; 4] = b"LVEC";

/// Current segment format version.
const FORMAT_VERSION: u32 = 1;

/// Size of the segment header in bytes.
const HEADER_SIZE: usize = 16;

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Number of bytes per document id (u32).
const BYTES_PER_ID: usize = 4;

/// On-disk vector segment for one collection.
#[derive(Debug)]
pub struct VectorSegmentFile {
    path: PathBuf,
}

impl VectorSegmentFile {
    /// Segment file inside a collection directory.
    pub fn new(collection_dir: &Path) -> Self {
        Self {
            path: collection_dir.join("segment_0.vec"),
        }
    }

    /// Whether the segment file exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Rewrites the segment with the given entries.
    ///
    /// Content is staged in a `.tmp` sibling and atomically renamed into
    /// place; the previous segment survives any failure before the rename.
    pub fn write_all(
        &self,
        dimension: usize,
        entries: &[(DocumentId, Vec<f32>)],
    ) -> StoreResult<()> {
        let entry_size = BYTES_PER_ID + dimension * BYTES_PER_F32;
        let mut buf = Vec::with_capacity(HEADER_SIZE + entries.len() * entry_size);

        buf.extend_from_slice(MAGIC_BYTES);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(dimension as u32).to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());

        for (id, vector) in entries {
            if vector.len() != dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            buf.extend_from_slice(&id.to_bytes());
            for value in vector {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }

        let tmp_path = self.path.with_extension("vec.tmp");
        std::fs::write(&tmp_path, &buf)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Reads every entry, returning the stored dimension and the vectors in
    /// file order.
    pub fn read_all(&self) -> StoreResult<(usize, Vec<(DocumentId, Vec<f32>)>)> {
        let file = File::open(&self.path)?;
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        if mmap.len() < HEADER_SIZE {
            return Err(StoreError::InvalidFormat(format!(
                "segment file too short: {} bytes",
                mmap.len()
            )));
        }

        if &mmap[0..4] != MAGIC_BYTES {
            return Err(StoreError::InvalidFormat(
                "bad magic bytes, not a vector segment".to_string(),
            ));
        }

        let version = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]);
        if version != FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: FORMAT_VERSION,
                actual: version,
            });
        }

        let dimension = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]) as usize;
        let count = u32::from_le_bytes([mmap[12], mmap[13], mmap[14], mmap[15]]) as usize;

        let entry_size = BYTES_PER_ID + dimension * BYTES_PER_F32;
        let expected_len = HEADER_SIZE + count * entry_size;
        if mmap.len() != expected_len {
            return Err(StoreError::InvalidFormat(format!(
                "truncated segment: expected {expected_len} bytes, found {}",
                mmap.len()
            )));
        }

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let offset = HEADER_SIZE + i * entry_size;
            let id = DocumentId::from_bytes([
                mmap[offset],
                mmap[offset + 1],
                mmap[offset + 2],
                mmap[offset + 3],
            ]);

            let mut vector = Vec::with_capacity(dimension);
            let data_offset = offset + BYTES_PER_ID;
            for j in 0..dimension {
                let value_offset = data_offset + j * BYTES_PER_F32;
                let value = f32::from_le_bytes([
                    mmap[value_offset],
                    mmap[value_offset + 1],
                    mmap[value_offset + 2],
                    mmap[value_offset + 3],
                ]);
                vector.push(value);
            }

            entries.push((id, vector));
        }

        Ok((dimension, entries))
    }
}
