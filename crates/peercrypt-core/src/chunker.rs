//! Chunking and file-level integrity (spec §3 "Chunk", §4.6 FIN validation).

use sha2::{Digest, Sha256};
use std::io;

/// Default chunk size, negotiated in INIT (spec §6.5).
pub const DEFAULT_CHUNK_SIZE: u32 = 4096;

/// Minimum negotiable chunk size.
pub const MIN_CHUNK_SIZE: u32 = 1024;

/// Maximum negotiable chunk size.
pub const MAX_CHUNK_SIZE: u32 = 8192;

/// Default MTU floor (spec §6.5).
pub const DEFAULT_MTU_FLOOR: u32 = 1400;

/// Clamp a proposed chunk size so that `chunk_size +
/// FRAME_HEADER_SIZE` never exceeds what `mtu_floor` implies is safe
/// for a single unfragmented frame, and never drops the chunk below
/// the spec's 1 KiB floor.
#[must_use]
pub fn clamp_chunk_size(requested: u32, mtu_floor: u32) -> u32 {
    let header = crate::frame::FRAME_HEADER_SIZE as u32;
    let mtu_bound = mtu_floor.saturating_sub(header).max(MIN_CHUNK_SIZE);
    requested.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE.min(mtu_bound.max(MIN_CHUNK_SIZE)))
}

/// Describes one chunk's position within the source file (spec §3 invariant:
/// chunk *i* covers bytes `[i*size, min((i+1)*size, filelen))`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Zero-based chunk index.
    pub index: u32,
    /// Start offset within the file.
    pub offset: u64,
    /// Number of bytes this chunk covers.
    pub len: u32,
}

/// Compute the ordered sequence of chunk spans for a file of `file_len`
/// bytes split into `chunk_size`-byte pieces.
#[must_use]
pub fn plan_chunks(file_len: u64, chunk_size: u32) -> Vec<ChunkSpan> {
    if chunk_size == 0 || file_len == 0 {
        return Vec::new();
    }
    let chunk_size_u64 = u64::from(chunk_size);
    let count = file_len.div_ceil(chunk_size_u64);
    (0..count)
        .map(|i| {
            let offset = i * chunk_size_u64;
            let end = ((i + 1) * chunk_size_u64).min(file_len);
            ChunkSpan {
                index: i as u32,
                offset,
                len: (end - offset) as u32,
            }
        })
        .collect()
}

/// Incremental SHA-256 over the whole file, used for the FIN
/// integrity check (spec §4.6, §8 property 1).
#[derive(Default)]
pub struct FileChecksum {
    hasher: Sha256,
}

impl FileChecksum {
    /// A fresh, empty running checksum.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of file bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalize into a 32-byte SHA-256 digest.
    #[must_use]
    pub fn finalize(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}

/// One-shot helper: hash a complete in-memory buffer.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Where a sender reads plaintext chunk bytes from, mirroring
/// [`crate::receiver::ChunkSink`] on the send side.
pub trait ChunkSource: Send {
    /// Read exactly `len` bytes starting at `offset` in the source file.
    fn read_chunk(&self, offset: u64, len: u32) -> io::Result<Vec<u8>>;
}

/// An in-memory source, used by tests and loopback transfers.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    /// The complete file contents.
    pub data: Vec<u8>,
}

impl InMemorySource {
    /// Wrap a complete in-memory file.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ChunkSource for InMemorySource {
    fn read_chunk(&self, offset: u64, len: u32) -> io::Result<Vec<u8>> {
        let start = offset as usize;
        let end = start + len as usize;
        if end > self.data.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "chunk range past end of file"));
        }
        Ok(self.data[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_chunks_covers_whole_file_exactly() {
        let spans = plan_chunks(1024, 256);
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[0], ChunkSpan { index: 0, offset: 0, len: 256 });
        assert_eq!(spans[3], ChunkSpan { index: 3, offset: 768, len: 256 });
    }

    #[test]
    fn plan_chunks_handles_uneven_final_chunk() {
        let spans = plan_chunks(1000, 256);
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[3].len, 1000 - 768);
    }

    #[test]
    fn reassembly_fidelity_property() {
        let file = (0u32..10_000).map(|i| (i % 251) as u8).collect::<Vec<_>>();
        let spans = plan_chunks(file.len() as u64, 333);
        let mut reassembled = vec![0u8; file.len()];
        let mut checksum = FileChecksum::new();
        for span in &spans {
            let chunk = &file[span.offset as usize..span.offset as usize + span.len as usize];
            reassembled[span.offset as usize..span.offset as usize + span.len as usize]
                .copy_from_slice(chunk);
        }
        checksum.update(&reassembled);
        assert_eq!(reassembled, file);
        assert_eq!(checksum.finalize(), sha256(&file));
    }

    #[test]
    fn in_memory_source_reads_exact_ranges() {
        let source = InMemorySource::new((0u8..=255).collect());
        let chunk = source.read_chunk(10, 20).unwrap();
        assert_eq!(chunk, (10u8..30).collect::<Vec<u8>>());
    }

    #[test]
    fn in_memory_source_rejects_out_of_range_reads() {
        let source = InMemorySource::new(vec![0u8; 10]);
        assert!(source.read_chunk(5, 100).is_err());
    }

    #[test]
    fn clamp_respects_mtu_floor_and_bounds() {
        assert_eq!(clamp_chunk_size(4096, 1400), MAX_CHUNK_SIZE.min(1400 - 20));
        assert_eq!(clamp_chunk_size(100, 1400), MIN_CHUNK_SIZE);
        assert_eq!(clamp_chunk_size(100_000, 1400), (1400u32 - 20).min(MAX_CHUNK_SIZE));
    }
}
