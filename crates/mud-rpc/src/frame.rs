//! Framed reading and writing of [`MudMessage`]s over any async byte stream.
//!
//! TCP delivers a stream of bytes, not messages: one `read` may return half a
//! frame, or two and a bit.  [`FrameReader`] keeps a buffer, appends whatever
//! the socket yields, and hands out a message each time the buffer holds a
//! complete one.

use mud_core::protocol::codec::{decode_message, encode_message_now};
use mud_core::protocol::SequenceCounter;
use mud_core::{MudMessage, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RpcError;

const READ_CHUNK: usize = 4096;

/// Reads whole frames from an async reader.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Returns the next message, or `Ok(None)` when the peer closed the
    /// stream cleanly between frames.
    ///
    /// # Errors
    ///
    /// [`RpcError::Closed`] if the stream ends in the middle of a frame,
    /// [`RpcError::Protocol`] for undecodable bytes, [`RpcError::Io`] for
    /// socket failures.
    pub async fn read_frame(&mut self) -> Result<Option<MudMessage>, RpcError> {
        loop {
            match decode_message(&self.buf) {
                Ok((msg, consumed)) => {
                    self.buf.drain(..consumed);
                    return Ok(Some(msg));
                }
                Err(ProtocolError::InsufficientData { .. }) => {}
                Err(e) => return Err(e.into()),
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return if self.buf.is_empty() {
                    Ok(None)
                } else {
                    Err(RpcError::Closed)
                };
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Writes frames to an async writer, numbering them with a private counter.
pub struct FrameWriter<W> {
    inner: W,
    seq: SequenceCounter,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            seq: SequenceCounter::new(),
        }
    }

    pub async fn write_frame(&mut self, msg: &MudMessage) -> Result<(), RpcError> {
        let bytes = encode_message_now(msg, self.seq.next())?;
        self.inner.write_all(&bytes).await?;
        self.inner.flush().await?;
        Ok(())
    }
}
