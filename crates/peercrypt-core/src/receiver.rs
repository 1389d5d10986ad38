//! Receiver (component F, spec §4.6).
//!
//! Reassembles chunks in file order, verifies the file-level checksum
//! at FIN, and generates cumulative ACKs. `next_expected` is strictly
//! monotone (spec §8 property 2): it only ever advances on receipt of
//! the chunk it is currently waiting for, draining any already-buffered
//! out-of-order chunks that follow.

use crate::chunker::{ChunkSpan, FileChecksum};
use crate::error::SessionError;
use std::collections::BTreeMap;
use std::io;

/// Where reassembled bytes are written. Exclusively owned by the
/// receiver (spec §5): no other task touches the destination file.
pub trait ChunkSink: Send {
    /// Write `data` at the given byte offset within the destination file.
    fn write_chunk(&mut self, offset: u64, data: &[u8]) -> io::Result<()>;
}

/// An in-memory sink, used by tests and by the Parallel policy's
/// in-process loopback scenarios.
#[derive(Debug, Default)]
pub struct InMemorySink {
    /// Accumulated file bytes.
    pub buffer: Vec<u8>,
}

impl ChunkSink for InMemorySink {
    fn write_chunk(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        let end = offset as usize + data.len();
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
        self.buffer[offset as usize..end].copy_from_slice(data);
        Ok(())
    }
}

/// What the receiver tells the coordinator to do after processing one
/// inbound DATA frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDecision {
    /// Emit a cumulative ACK for this sequence number.
    Ack(u32),
}

/// Reassembly state for one inbound transfer.
pub struct Receiver<S: ChunkSink> {
    next_expected: u32,
    chunk_size: u32,
    total_length: u64,
    sink: S,
    reorder_buffer: BTreeMap<u32, (ChunkSpan, Vec<u8>)>,
    reorder_capacity: usize,
    checksum: FileChecksum,
}

impl<S: ChunkSink> Receiver<S> {
    /// Start a fresh receiver for a file of `total_length` bytes split
    /// into `chunk_size`-byte chunks, writing into `sink`.
    #[must_use]
    pub fn new(sink: S, chunk_size: u32, total_length: u64, reorder_capacity: usize) -> Self {
        Self {
            next_expected: 0,
            chunk_size,
            total_length,
            sink,
            reorder_buffer: BTreeMap::new(),
            reorder_capacity,
            checksum: FileChecksum::new(),
        }
    }

    /// The receiver's current cumulative sequence number (spec §8 property 2:
    /// non-decreasing across the session's lifetime).
    #[must_use]
    pub fn next_expected(&self) -> u32 {
        self.next_expected
    }

    /// Process one inbound DATA chunk (spec §4.6): if it's the next
    /// expected index, write it, advance, and drain any buffered
    /// successors; if it's old, ignore the payload but still emit the
    /// latest cumulative ACK (this drives triple-dup-ACK detection on
    /// the sender); if it's ahead, buffer it (dropping the
    /// highest-offset entry first on overflow).
    pub fn on_data(
        &mut self,
        index: u32,
        span: ChunkSpan,
        payload: &[u8],
    ) -> Result<AckDecision, SessionError> {
        if index < self.next_expected {
            // Duplicate/old chunk: ignore payload, re-emit latest ACK.
            return Ok(AckDecision::Ack(self.next_expected.saturating_sub(1)));
        }

        if index == self.next_expected {
            self.write_in_order(span, payload)?;
            self.drain_buffered()?;
        } else {
            self.buffer_out_of_order(index, span, payload);
        }

        Ok(AckDecision::Ack(self.next_expected.saturating_sub(1)))
    }

    fn write_in_order(&mut self, span: ChunkSpan, payload: &[u8]) -> Result<(), SessionError> {
        self.sink
            .write_chunk(span.offset, payload)
            .map_err(|_| SessionError::BufferOverflow { capacity: 0 })?;
        self.checksum.update(payload);
        self.next_expected += 1;
        Ok(())
    }

    fn drain_buffered(&mut self) -> Result<(), SessionError> {
        while let Some((span, payload)) = self.reorder_buffer.remove(&self.next_expected) {
            self.write_in_order(span, &payload)?;
        }
        Ok(())
    }

    fn buffer_out_of_order(&mut self, index: u32, span: ChunkSpan, payload: &[u8]) {
        if self.reorder_buffer.len() >= self.reorder_capacity {
            // Overflow drops the highest-offset chunk first (spec §4.6).
            if let Some((&highest, _)) = self.reorder_buffer.iter().next_back() {
                if highest > index {
                    self.reorder_buffer.remove(&highest);
                } else {
                    return; // incoming chunk is itself the highest offset; drop it instead
                }
            }
        }
        self.reorder_buffer.insert(index, (span, payload.to_vec()));
    }

    /// Finalize reassembly at FIN and verify the file-level SHA-256.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::IntegrityMismatch`] if the computed
    /// digest does not match `expected_checksum`, or if not every
    /// chunk was received.
    pub fn verify_fin(self, expected_checksum: [u8; 32]) -> Result<S, SessionError> {
        let all_received = u64::from(self.next_expected) * u64::from(self.chunk_size) >= self.total_length;
        if !all_received || !self.reorder_buffer.is_empty() {
            return Err(SessionError::IntegrityMismatch);
        }
        let digest = self.checksum.finalize();
        if digest != expected_checksum {
            return Err(SessionError::IntegrityMismatch);
        }
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{plan_chunks, sha256};

    #[test]
    fn in_order_delivery_is_byte_exact() {
        let file: Vec<u8> = (0..10_000u32).map(|i| (i % 250) as u8).collect();
        let spans = plan_chunks(file.len() as u64, 1000);
        let mut receiver = Receiver::new(InMemorySink::default(), 1000, file.len() as u64, 16);
        for span in &spans {
            let chunk = &file[span.offset as usize..(span.offset as usize + span.len as usize)];
            receiver.on_data(span.index, *span, chunk).unwrap();
        }
        let sink = receiver.verify_fin(sha256(&file)).unwrap();
        assert_eq!(sink.buffer, file);
    }

    #[test]
    fn out_of_order_delivery_reassembles_correctly() {
        let file: Vec<u8> = (0..4000u32).map(|i| (i % 200) as u8).collect();
        let spans = plan_chunks(file.len() as u64, 1000);
        let mut receiver = Receiver::new(InMemorySink::default(), 1000, file.len() as u64, 16);
        for span in spans.iter().rev() {
            let chunk = &file[span.offset as usize..(span.offset as usize + span.len as usize)];
            receiver.on_data(span.index, *span, chunk).unwrap();
        }
        let sink = receiver.verify_fin(sha256(&file)).unwrap();
        assert_eq!(sink.buffer, file);
    }

    #[test]
    fn duplicate_chunk_reemits_ack_without_rewriting() {
        let file: Vec<u8> = vec![7u8; 2000];
        let spans = plan_chunks(file.len() as u64, 1000);
        let mut receiver = Receiver::new(InMemorySink::default(), 1000, file.len() as u64, 16);
        let first = receiver.on_data(0, spans[0], &file[0..1000]).unwrap();
        let dup = receiver.on_data(0, spans[0], &file[0..1000]).unwrap();
        assert_eq!(first, dup);
        assert_eq!(receiver.next_expected(), 1);
    }

    #[test]
    fn sequence_monotonicity_across_interleaved_delivery() {
        let file: Vec<u8> = (0..5000u32).map(|i| (i % 200) as u8).collect();
        let spans = plan_chunks(file.len() as u64, 1000);
        let mut receiver = Receiver::new(InMemorySink::default(), 1000, file.len() as u64, 16);
        let order = [0usize, 2, 1, 4, 3];
        let mut last = 0u32;
        for &i in &order {
            let span = spans[i];
            let chunk = &file[span.offset as usize..(span.offset as usize + span.len as usize)];
            receiver.on_data(span.index, span, chunk).unwrap();
            assert!(receiver.next_expected() >= last);
            last = receiver.next_expected();
        }
    }

    #[test]
    fn integrity_mismatch_detected_at_fin() {
        let file: Vec<u8> = vec![1u8; 1000];
        let spans = plan_chunks(file.len() as u64, 1000);
        let mut receiver = Receiver::new(InMemorySink::default(), 1000, file.len() as u64, 16);
        receiver.on_data(spans[0].index, spans[0], &file).unwrap();
        let wrong_checksum = [0u8; 32];
        assert!(receiver.verify_fin(wrong_checksum).is_err());
    }

    #[test]
    fn reorder_buffer_overflow_drops_highest_offset_first() {
        let chunk_size = 100;
        let total_chunks = 10u32;
        let file: Vec<u8> = vec![9u8; chunk_size as usize * total_chunks as usize];
        let spans = plan_chunks(file.len() as u64, chunk_size);
        // Capacity 2: buffer indices 5..=9 out of order (never send 0),
        // only the two lowest should survive eviction pressure.
        let mut receiver = Receiver::new(InMemorySink::default(), chunk_size, file.len() as u64, 2);
        for span in spans.iter().skip(1) {
            let chunk = &file[span.offset as usize..(span.offset as usize + span.len as usize)];
            receiver.on_data(span.index, *span, chunk).unwrap();
        }
        assert!(receiver.reorder_buffer.len() <= 2);
        assert!(receiver.reorder_buffer.contains_key(&1));
    }
}
