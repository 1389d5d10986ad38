//! Session coordinator (component G, spec §4.4, §4.6, §7).
//!
//! Owns the state machine and the active transmission policy, pumps
//! frames across a transport, runs the RTO timer, and drives
//! cancellation. This is the one place that ties components B-F
//! together into a running transfer.

use crate::chunker::ChunkSource;
use crate::config::Config;
use crate::error::{CoreError, ReasonCode, SessionError};
use crate::frame::{Frame, FrameFlags, FrameType};
use crate::policy::{PacingGate, SendDecision};
use crate::receiver::{AckDecision, ChunkSink, Receiver};
use crate::session::{FileMetadata, SenderSession};
use crate::state_machine::{TransferEvent, TransferState};
use crate::stats::{NullObserver, TransferObserver};
use crate::transport::{read_frame, write_frame};
use peercrypt_crypto::SessionKey;
use rand::rngs::OsRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// A shared flag an operator can set to request cancellation (spec §7:
/// "cancellation transitions the session to ERROR after a bounded
/// grace period draining outstanding ACKs").
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// A fresh, not-yet-cancelled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives one sender-side transfer end to end over `stream`.
pub struct SenderCoordinator<T> {
    session: SenderSession,
    gate: Box<dyn PacingGate>,
    observer: Arc<dyn TransferObserver>,
    source: Box<dyn ChunkSource>,
    key: SessionKey,
    stream: T,
    recv_buf: Vec<u8>,
    cancel: CancelHandle,
    mac_failures: u32,
    mac_failure_threshold: u32,
}

impl<T> SenderCoordinator<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Build a coordinator ready to run the handshake, then the transfer.
    pub fn new(
        session: SenderSession,
        gate: Box<dyn PacingGate>,
        source: Box<dyn ChunkSource>,
        key: SessionKey,
        stream: T,
        config: &Config,
    ) -> Self {
        Self {
            session,
            gate,
            observer: Arc::new(NullObserver),
            source,
            key,
            stream,
            recv_buf: Vec::new(),
            cancel: CancelHandle::new(),
            mac_failures: 0,
            mac_failure_threshold: config.mac_failure_threshold,
        }
    }

    /// Replace the default no-op observer.
    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// A handle the operator can use to request cancellation mid-transfer.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Perform the INIT/ACK-of-INIT handshake (spec §4.4 IDLE -> CONNECTING -> TRANSFER).
    pub async fn handshake(&mut self, timeout: Duration) -> Result<(), CoreError> {
        self.session.apply_event(TransferEvent::InitiateSend)?;
        let metadata_json = serde_json::to_vec(self.session.metadata())
            .expect("FileMetadata always serializes");
        let sealed = peercrypt_crypto::seal(&self.key, &metadata_json, &[], &mut OsRng);
        let init = Frame {
            frame_type: FrameType::Init,
            sequence: 0,
            timestamp_ms: self.session.elapsed_ms(),
            flags: FrameFlags::new().with(FrameFlags::ENCRYPTED),
            payload: sealed,
        };
        write_frame(&mut self.stream, &init, &self.key).await?;

        let result = tokio::time::timeout(
            timeout,
            read_frame(&mut self.stream, &mut self.recv_buf, &self.key),
        )
        .await;
        match result {
            Ok(Ok(frame)) if frame.frame_type == FrameType::Ack => {
                self.session.apply_event(TransferEvent::AckOfInit)?;
                Ok(())
            }
            _ => {
                self.session.apply_event(TransferEvent::ConnectTimeoutOrReset)?;
                Err(CoreError::fatal(ReasonCode::HandshakeTimeout, "no ACK-of-INIT within timeout"))
            }
        }
    }

    /// Stream every chunk, responding to ACKs, retransmissions, and
    /// cancellation, until the whole file is acknowledged (spec §4.4
    /// TRANSFER -> VALIDATING).
    pub async fn run_transfer(&mut self) -> Result<(), CoreError> {
        while !self.session.all_acked() {
            if self.cancel.is_cancelled() {
                self.send_rst().await?;
                self.session.apply_event(TransferEvent::FatalDuringTransfer)?;
                return Err(CoreError::fatal(ReasonCode::Cancelled, "cancelled by operator"));
            }

            if let Some(age) = self.session.oldest_outstanding_age() {
                if age >= self.session.rto() {
                    self.session.on_rto_expiry();
                    if let Some((seq, span)) = self.session.lowest_unacked() {
                        self.observer.on_retransmit(seq);
                        self.send_chunk(seq, span.offset, span.len).await?;
                    }
                }
            }

            let decision = match self.session.peek_next_chunk() {
                Some(span) => self.gate.poll(span.len, self.session.outstanding_count(), std::time::Instant::now()),
                None => SendDecision::YieldForAck,
            };

            match decision {
                SendDecision::SendNow => {
                    if let Ok((seq, span)) = self.session.mark_sent() {
                        self.gate.on_send(span.len, std::time::Instant::now());
                        self.send_chunk(seq, span.offset, span.len).await?;
                        self.observer.on_chunk_sent(seq, span.len as usize);
                    }
                }
                SendDecision::WaitUntil(until) => {
                    tokio::time::sleep_until(until.into()).await;
                }
                SendDecision::YieldForAck => {}
            }

            self.poll_incoming(Duration::from_millis(20)).await?;
        }
        self.session.apply_event(TransferEvent::LastChunkAcked)?;
        Ok(())
    }

    /// Send FIN and wait for the peer's validation result (spec §4.4
    /// VALIDATING -> COMPLETED/ERROR).
    pub async fn finish(&mut self, timeout: Duration) -> Result<(), CoreError> {
        let checksum = self.session.metadata().file_checksum;
        let sealed = peercrypt_crypto::seal(&self.key, &checksum, &[], &mut OsRng);
        let fin = Frame {
            frame_type: FrameType::Fin,
            sequence: self.session.metadata().total_length as u16,
            timestamp_ms: self.session.elapsed_ms(),
            flags: FrameFlags::new().with(FrameFlags::ENCRYPTED),
            payload: sealed,
        };
        write_frame(&mut self.stream, &fin, &self.key).await?;

        let result = tokio::time::timeout(
            timeout,
            read_frame(&mut self.stream, &mut self.recv_buf, &self.key),
        )
        .await;
        match result {
            Ok(Ok(frame)) if frame.frame_type == FrameType::Ack => {
                self.session.apply_event(TransferEvent::ValidationSucceeded)?;
                Ok(())
            }
            _ => {
                self.session.apply_event(TransferEvent::ValidationFailed)?;
                Err(CoreError::fatal(ReasonCode::IntegrityMismatch, "peer rejected FIN validation"))
            }
        }
    }

    /// Current lifecycle state, for operator reporting.
    #[must_use]
    pub fn state(&self) -> TransferState {
        self.session.state()
    }

    async fn send_chunk(&mut self, seq: u16, offset: u64, len: u32) -> Result<(), CoreError> {
        let plaintext = self.source.read_chunk(offset, len)?;
        let sealed = peercrypt_crypto::seal(&self.key, &plaintext, &seq.to_be_bytes(), &mut OsRng);
        let frame = Frame {
            frame_type: FrameType::Data,
            sequence: seq,
            timestamp_ms: self.session.elapsed_ms(),
            flags: FrameFlags::new().with(FrameFlags::ENCRYPTED).with(FrameFlags::REQUIRES_ACK),
            payload: sealed,
        };
        write_frame(&mut self.stream, &frame, &self.key).await?;
        Ok(())
    }

    async fn send_rst(&mut self) -> Result<(), CoreError> {
        let frame = Frame {
            frame_type: FrameType::Rst,
            sequence: 0,
            timestamp_ms: self.session.elapsed_ms(),
            flags: FrameFlags::new(),
            payload: Vec::new(),
        };
        write_frame(&mut self.stream, &frame, &self.key).await?;
        Ok(())
    }

    async fn poll_incoming(&mut self, budget: Duration) -> Result<(), CoreError> {
        let outcome = tokio::time::timeout(
            budget,
            read_frame(&mut self.stream, &mut self.recv_buf, &self.key),
        )
        .await;
        let Ok(result) = outcome else {
            return Ok(()); // nothing arrived within the budget; not an error
        };
        match result {
            Ok(frame) if frame.frame_type == FrameType::Ack => {
                let event = self.session.register_ack(frame.sequence);
                self.observer.on_chunk_acked(frame.sequence);
                if event == crate::congestion::DupAckEvent::TripleDuplicate {
                    self.session.on_fast_retransmit();
                    if let Some((seq, span)) = self.session.lowest_unacked() {
                        self.observer.on_retransmit(seq);
                        self.send_chunk(seq, span.offset, span.len).await?;
                    }
                }
                self.observer.on_cwnd_change(self.session.window().cwnd(), self.session.window().ssthresh());
                Ok(())
            }
            Ok(frame) if frame.frame_type == FrameType::Rst || frame.frame_type == FrameType::Error => {
                Err(CoreError::Session(SessionError::ResetByPeer(format!("{:?}", frame.frame_type))))
            }
            Ok(_) => Ok(()), // unexpected frame type mid-transfer; ignore
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                self.observer.on_mac_failure();
                self.mac_failures += 1;
                if self.mac_failures >= self.mac_failure_threshold {
                    Err(CoreError::fatal(ReasonCode::MacFailureThreshold, "MAC failure rate exceeded threshold"))
                } else {
                    Ok(())
                }
            }
            Err(err) => Err(CoreError::Io(err)),
        }
    }
}

/// Drives one receiver-side transfer end to end over `stream`.
pub struct ReceiverCoordinator<T, S: ChunkSink> {
    state: TransferState,
    key: SessionKey,
    stream: T,
    recv_buf: Vec<u8>,
    observer: Arc<dyn TransferObserver>,
    reorder_capacity: usize,
    sink: Option<S>,
    receiver: Option<Receiver<S>>,
    chunk_size: u32,
}

impl<T, S> ReceiverCoordinator<T, S>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    S: ChunkSink,
{
    /// A fresh coordinator awaiting an INIT frame.
    pub fn new(stream: T, key: SessionKey, sink: S, reorder_capacity: usize) -> Self {
        Self {
            state: TransferState::Idle,
            key,
            stream,
            recv_buf: Vec::new(),
            observer: Arc::new(NullObserver),
            reorder_capacity,
            sink: Some(sink),
            receiver: None,
            chunk_size: 0,
        }
    }

    /// Replace the default no-op observer.
    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Receive INIT, build the reassembly buffer, and ACK it.
    pub async fn accept(&mut self) -> Result<FileMetadata, CoreError> {
        let frame = read_frame(&mut self.stream, &mut self.recv_buf, &self.key).await?;
        if frame.frame_type != FrameType::Init {
            return Err(CoreError::fatal(ReasonCode::ProtocolViolation, "expected INIT"));
        }
        let plaintext = peercrypt_crypto::open(&self.key, &frame.payload, &[])?;
        let metadata: FileMetadata =
            serde_json::from_slice(&plaintext).map_err(|_| CoreError::fatal(ReasonCode::ProtocolViolation, "malformed INIT payload"))?;

        self.state = self.state.apply(TransferEvent::InitiateSend)?;
        let ack = ack_frame(0);
        write_frame(&mut self.stream, &ack, &self.key).await?;
        self.state = self.state.apply(TransferEvent::AckOfInit)?;

        self.chunk_size = metadata.chunk_size;
        self.receiver = Some(Receiver::new(
            self.sink.take().expect("sink consumed only once"),
            metadata.chunk_size,
            metadata.total_length,
            self.reorder_capacity,
        ));
        Ok(metadata)
    }

    /// Process inbound DATA frames, ACKing each, until FIN arrives;
    /// verify the file-level checksum and ACK or reject accordingly
    /// (spec §4.6).
    pub async fn drive_to_completion(&mut self, expected_checksum: [u8; 32]) -> Result<S, CoreError> {
        let mut receiver = self.receiver.take().expect("accept() must run first");
        loop {
            let frame = read_frame(&mut self.stream, &mut self.recv_buf, &self.key).await?;
            match frame.frame_type {
                FrameType::Data => {
                    let plaintext = peercrypt_crypto::open(&self.key, &frame.payload, &frame.sequence.to_be_bytes())?;
                    let index = u32::from(frame.sequence);
                    let span = crate::chunker::ChunkSpan {
                        index,
                        offset: u64::from(index) * u64::from(self.chunk_size),
                        len: plaintext.len() as u32,
                    };
                    let AckDecision::Ack(ack_seq) = receiver.on_data(index, span, &plaintext)?;
                    self.observer.on_chunk_acked(ack_seq as u16);
                    write_frame(&mut self.stream, &ack_frame(ack_seq as u16), &self.key).await?;
                }
                FrameType::Fin => {
                    self.state = self.state.apply(TransferEvent::LastChunkAcked)?;
                    return match receiver.verify_fin(expected_checksum) {
                        Ok(sink) => {
                            self.state = self.state.apply(TransferEvent::ValidationSucceeded)?;
                            write_frame(&mut self.stream, &ack_frame(0), &self.key).await?;
                            Ok(sink)
                        }
                        Err(err) => {
                            self.state = self.state.apply(TransferEvent::ValidationFailed)?;
                            let error_frame = Frame {
                                frame_type: FrameType::Error,
                                sequence: 0,
                                timestamp_ms: 0,
                                flags: FrameFlags::new(),
                                payload: Vec::new(),
                            };
                            write_frame(&mut self.stream, &error_frame, &self.key).await?;
                            Err(CoreError::Session(err))
                        }
                    };
                }
                FrameType::Rst => {
                    return Err(CoreError::Session(SessionError::ResetByPeer("RST".into())));
                }
                _ => continue,
            }
        }
    }
}

fn ack_frame(sequence: u16) -> Frame {
    Frame {
        frame_type: FrameType::Ack,
        sequence,
        timestamp_ms: 0,
        flags: FrameFlags::new(),
        payload: Vec::new(),
    }
}
