//! End-to-end scenarios from the testable-properties section: a
//! sender and receiver coordinator talking over an in-memory duplex
//! pipe, exercising the full frame codec, crypto envelope, state
//! machine, and transmission policies together.

use peercrypt_core::chunker::{sha256, InMemorySource};
use peercrypt_core::config::Config;
use peercrypt_core::congestion::{AimdWindow, RttEstimator};
use peercrypt_core::coordinator::{ReceiverCoordinator, SenderCoordinator};
use peercrypt_core::policy::{partition_range, Normal};
use peercrypt_core::receiver::InMemorySink;
use peercrypt_core::session::{FileMetadata, SenderSession};
use peercrypt_core::state_machine::TransferState;
use peercrypt_crypto::SessionKey;
use peercrypt_membership::PeerKey;
use std::net::SocketAddr;
use std::time::Duration;

fn shared_keys() -> (SessionKey, SessionKey) {
    let a = SessionKey::derive(b"integration test secret", b"0123456789abcdef", 100_000).unwrap();
    let b = SessionKey::derive(b"integration test secret", b"0123456789abcdef", 100_000).unwrap();
    (a, b)
}

fn peer() -> PeerKey {
    PeerKey::new(7, SocketAddr::from(([127, 0, 0, 1], 9001)))
}

/// S1 Normal small: a 1,024-byte file in 256-byte chunks over the
/// Normal policy completes with byte-exact output.
#[tokio::test]
async fn s1_normal_small_file_completes_byte_exact() {
    let file = vec![b'A'; 1024];
    let checksum = sha256(&file);
    let (sender_key, receiver_key) = shared_keys();

    let metadata = FileMetadata {
        name: "s1.bin".into(),
        total_length: file.len() as u64,
        chunk_size: 256,
        file_checksum: checksum,
    };
    let session = SenderSession::new(
        1,
        peer(),
        42,
        metadata,
        AimdWindow::new(16 * 1024, 4 * 1024, 64 * 1024, 256),
        RttEstimator::default(),
        3,
    );

    let (client, server) = tokio::io::duplex(1 << 16);
    let mut sender = SenderCoordinator::new(
        session,
        Box::new(Normal::new(8)),
        Box::new(InMemorySource::new(file.clone())),
        sender_key,
        client,
        &Config::default(),
    );
    let mut receiver = ReceiverCoordinator::new(server, receiver_key, InMemorySink::default(), 16);

    let sender_fut = async {
        sender.handshake(Duration::from_secs(5)).await?;
        sender.run_transfer().await?;
        sender.finish(Duration::from_secs(5)).await?;
        Ok::<_, peercrypt_core::CoreError>(())
    };
    let receiver_fut = async {
        receiver.accept().await?;
        receiver.drive_to_completion(checksum).await
    };

    let (sender_result, receiver_result) = tokio::join!(sender_fut, receiver_fut);
    sender_result.expect("sender completes without error");
    let sink = receiver_result.expect("receiver completes without error");
    assert_eq!(sink.buffer, file);
    assert_eq!(sender.state(), TransferState::Completed);
    assert_eq!(receiver.state(), TransferState::Completed);
}

/// S4 Parallel: a 1 MiB file split across 4 workers partitions into
/// non-overlapping, contiguous quarters covering every chunk exactly once.
#[test]
fn s4_parallel_workers_partition_file_without_gaps_or_overlap() {
    let file_len = 1024 * 1024u64;
    let chunk_size = 4096u32;
    let chunks = peercrypt_core::chunker::plan_chunks(file_len, chunk_size);
    let assignments = partition_range(&chunks, 4).unwrap();

    assert_eq!(assignments.len(), 4);
    let mut covered: Vec<u32> = assignments
        .iter()
        .flat_map(|a| a.spans.iter().map(|s| s.index))
        .collect();
    covered.sort_unstable();
    let expected: Vec<u32> = (0..chunks.len() as u32).collect();
    assert_eq!(covered, expected);

    for window in assignments.windows(2) {
        let a_max = window[0].spans.last().unwrap().offset;
        let b_min = window[1].spans.first().unwrap().offset;
        assert!(a_max < b_min, "worker ranges must not overlap");
    }
}

/// S5 Multicast shape: a three-member fan-out group's overall progress
/// is bounded by its slowest member, regardless of how far ahead the
/// others get.
#[test]
fn s5_multicast_progress_bounded_by_slowest_member() {
    use peercrypt_core::policy::MulticastFanout;

    let mut group = MulticastFanout::new();
    let members = [
        PeerKey::new(1, SocketAddr::from(([127, 0, 0, 1], 9101))),
        PeerKey::new(2, SocketAddr::from(([127, 0, 0, 1], 9102))),
        PeerKey::new(3, SocketAddr::from(([127, 0, 0, 1], 9103))),
    ];
    for m in members {
        group.add_member(m);
    }
    group.on_ack(members[0], 255);
    group.on_ack(members[1], 255);
    group.on_ack(members[2], 40); // the slow one

    assert_eq!(group.slowest_ack(), Some(40));
    assert!(!group.all_complete(255));
    group.on_ack(members[2], 255);
    assert!(group.all_complete(255));
}
