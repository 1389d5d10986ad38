//! Parallel policy: splits one file transfer across several workers,
//! each owning a contiguous, non-overlapping chunk range (spec §4.5.5).

use crate::chunker::ChunkSpan;
use crate::error::PolicyError;

/// One worker's contiguous slice of the overall chunk plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAssignment {
    /// Worker index, `0..worker_count`.
    pub worker_id: usize,
    /// Chunks this worker is responsible for sending, in order.
    pub spans: Vec<ChunkSpan>,
}

/// Partition `chunks` into `worker_count` contiguous, roughly
/// equal-sized ranges. Each worker independently runs its own
/// sliding-window pacing (spec §4.5.5: "each worker independently
/// manages its own outstanding-ACK window over its assigned range").
///
/// # Errors
///
/// Returns [`PolicyError::InvalidRangeAssignment`] if `worker_count`
/// is zero or exceeds the number of available chunks.
pub fn partition_range(
    chunks: &[ChunkSpan],
    worker_count: usize,
) -> Result<Vec<WorkerAssignment>, PolicyError> {
    if worker_count == 0 || worker_count > chunks.len().max(1) {
        return Err(PolicyError::InvalidRangeAssignment);
    }
    if chunks.is_empty() {
        return Ok((0..worker_count)
            .map(|worker_id| WorkerAssignment {
                worker_id,
                spans: Vec::new(),
            })
            .collect());
    }

    let base = chunks.len() / worker_count;
    let remainder = chunks.len() % worker_count;
    let mut assignments = Vec::with_capacity(worker_count);
    let mut cursor = 0;
    for worker_id in 0..worker_count {
        let take = base + usize::from(worker_id < remainder);
        let spans = chunks[cursor..cursor + take].to_vec();
        cursor += take;
        assignments.push(WorkerAssignment { worker_id, spans });
    }
    debug_assert_eq!(cursor, chunks.len());
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::plan_chunks;

    #[test]
    fn partitions_cover_every_chunk_exactly_once() {
        let chunks = plan_chunks(10_000, 333);
        let assignments = partition_range(&chunks, 4).unwrap();
        let mut seen: Vec<u32> = assignments
            .iter()
            .flat_map(|a| a.spans.iter().map(|s| s.index))
            .collect();
        seen.sort_unstable();
        let expected: Vec<u32> = (0..chunks.len() as u32).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn ranges_stay_within_one_chunk_of_each_other() {
        let chunks = plan_chunks(10_007, 100);
        let assignments = partition_range(&chunks, 3).unwrap();
        let sizes: Vec<usize> = assignments.iter().map(|a| a.spans.len()).collect();
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
    }

    #[test]
    fn rejects_more_workers_than_chunks() {
        let chunks = plan_chunks(100, 100);
        assert!(matches!(
            partition_range(&chunks, 5),
            Err(PolicyError::InvalidRangeAssignment)
        ));
    }

    #[test]
    fn rejects_zero_workers() {
        let chunks = plan_chunks(100, 10);
        assert!(matches!(
            partition_range(&chunks, 0),
            Err(PolicyError::InvalidRangeAssignment)
        ));
    }
}
