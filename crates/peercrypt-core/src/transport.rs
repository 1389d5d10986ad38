//! Frame-level transport helpers (component G support, spec §5).
//!
//! Frames ride an arbitrary byte stream; the coordinator doesn't care
//! whether that's a `TcpStream` or, in tests, an in-memory duplex
//! pipe. [`read_frame`] grows a receive buffer until a full frame
//! parses, so a frame split across TCP segments is handled the same
//! way as one that arrives whole.

use crate::error::FrameError;
use crate::frame::Frame;
use peercrypt_crypto::SessionKey;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Write one encoded frame to `stream`.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    stream: &mut W,
    frame: &Frame,
    key: &SessionKey,
) -> std::io::Result<()> {
    let encoded = frame.encode(key);
    stream.write_all(&encoded).await
}

/// Read exactly one frame from `stream`, growing `recv_buf` with
/// however many reads it takes and leaving any bytes belonging to the
/// next frame in place for the following call.
///
/// # Errors
///
/// Returns [`FrameError`] for anything other than a transient
/// "need more bytes" condition, and propagates I/O errors as
/// [`std::io::Error`] wrapped by the caller.
pub async fn read_frame<R: AsyncRead + Unpin>(
    stream: &mut R,
    recv_buf: &mut Vec<u8>,
    key: &SessionKey,
) -> std::io::Result<Frame> {
    loop {
        match Frame::decode(recv_buf, key) {
            Ok((frame, consumed)) => {
                recv_buf.drain(..consumed);
                return Ok(frame);
            }
            Err(FrameError::Incomplete { .. }) => {
                let mut chunk = [0u8; 4096];
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "peer closed connection mid-frame",
                    ));
                }
                recv_buf.extend_from_slice(&chunk[..n]);
            }
            Err(other) => {
                return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, other))
            }
        }
    }
}
