//! Property tests for the testable invariants that hold over wide
//! input ranges rather than one concrete scenario.

use peercrypt_core::chunker::{plan_chunks, sha256, FileChecksum};
use peercrypt_core::congestion::AimdWindow;
use peercrypt_core::receiver::{InMemorySink, Receiver};
use proptest::prelude::*;

proptest! {
    /// Property 1 (reassembly fidelity): any file, any chunk size,
    /// delivered through the receiver in any order, reassembles
    /// byte-exact with a matching checksum.
    #[test]
    fn reassembly_is_order_independent(
        file in prop::collection::vec(any::<u8>(), 1..4096),
        chunk_size in 64u32..1024,
        seed in any::<u64>(),
    ) {
        let spans = plan_chunks(file.len() as u64, chunk_size);
        let mut order: Vec<usize> = (0..spans.len()).collect();
        // Deterministic pseudo-shuffle from the proptest-supplied seed.
        let mut state = seed.max(1);
        for i in (1..order.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let j = (state >> 33) as usize % (i + 1);
            order.swap(i, j);
        }

        let mut receiver = Receiver::new(InMemorySink::default(), chunk_size, file.len() as u64, spans.len().max(1));
        for &i in &order {
            let span = spans[i];
            let chunk = &file[span.offset as usize..(span.offset as usize + span.len as usize)];
            receiver.on_data(span.index, span, chunk).unwrap();
        }
        let sink = receiver.verify_fin(sha256(&file)).unwrap();
        prop_assert_eq!(sink.buffer, file);
    }

    /// Property 3 (window bounds): no sequence of ACK/loss events ever
    /// pushes cwnd outside [min_window, max_window].
    #[test]
    fn aimd_window_always_bounded(
        events in prop::collection::vec(0u8..3, 1..200),
        mss in 256u32..2048,
    ) {
        let min_window = mss;
        let max_window = mss * 64;
        let mut window = AimdWindow::new(min_window * 4, min_window, max_window, mss);
        for event in events {
            match event {
                0 => window.on_new_ack(),
                1 => window.on_triple_duplicate_ack(),
                _ => window.on_rto_expiry(),
            }
            prop_assert!(window.cwnd() >= min_window);
            prop_assert!(window.cwnd() <= max_window);
        }
    }

    /// Running checksum over chunked input matches a one-shot hash of
    /// the whole buffer, regardless of how it's split.
    #[test]
    fn incremental_checksum_matches_one_shot(
        file in prop::collection::vec(any::<u8>(), 0..4096),
        chunk_size in 1usize..512,
    ) {
        let mut checksum = FileChecksum::new();
        for chunk in file.chunks(chunk_size) {
            checksum.update(chunk);
        }
        prop_assert_eq!(checksum.finalize(), sha256(&file));
    }
}
