//! Caller side of a bound connection.
//!
//! An [`RpcClient`] owns one TCP connection that has completed the HELLO
//! handshake for a single binding.  It is cheap to share behind an `Arc`:
//! any number of tasks may call [`RpcClient::call`] concurrently.
//!
//! Internally two background tasks drive the socket:
//!
//! - the **writer** drains an `mpsc` queue of outbound frames, so callers
//!   never contend on the socket;
//! - the **reader** decodes inbound frames, hands each `Reply` to the caller
//!   waiting on its `call_id`, and answers `Ping` with `Pong`.
//!
//! When the reader stops (peer closed, reset, garbage on the wire) the
//! client is marked closed and every waiting caller receives
//! [`RpcError::Closed`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mud_core::protocol::messages::{
    CallMessage, DisconnectReason, HelloMessage, ReplyMessage, Request, Response,
    PROTOCOL_VERSION,
};
use mud_core::protocol::SequenceCounter;
use mud_core::{MudError, MudMessage};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, trace, warn};

use crate::error::RpcError;
use crate::frame::{FrameReader, FrameWriter};

const OUTBOUND_QUEUE: usize = 64;

/// Timeouts applied by an [`RpcClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcOptions {
    /// Upper bound on TCP connect plus the HELLO round trip.
    pub connect_timeout: Duration,
    /// Upper bound on waiting for one reply.
    pub call_timeout: Duration,
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            call_timeout: Duration::from_millis(10_000),
        }
    }
}

type Outcome = Result<Response, MudError>;
type PendingCalls = Arc<Mutex<HashMap<u64, oneshot::Sender<Outcome>>>>;

/// A handshaken connection to one remote binding.
pub struct RpcClient {
    addr: String,
    binding: String,
    outbound: mpsc::Sender<MudMessage>,
    pending: PendingCalls,
    call_ids: SequenceCounter,
    closed: Arc<AtomicBool>,
    call_timeout: Duration,
    reader: JoinHandle<()>,
}

impl RpcClient {
    /// Connects to `addr`, performs the HELLO handshake for `binding`, and
    /// starts the background reader and writer.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Connect`] if the TCP connection cannot be established in
    ///   time.
    /// - [`RpcError::Rejected`] if the host has nothing bound under `binding`.
    /// - [`RpcError::Timeout`] if the host does not answer the HELLO in time.
    pub async fn connect(
        addr: &str,
        binding: &str,
        peer_name: &str,
        options: RpcOptions,
    ) -> Result<Self, RpcError> {
        let stream = time::timeout(options.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| RpcError::Connect {
                addr: addr.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
            })?
            .map_err(|source| RpcError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        let mut reader = FrameReader::new(read_half);
        let mut writer = FrameWriter::new(write_half);

        writer
            .write_frame(&MudMessage::Hello(HelloMessage {
                protocol_version: PROTOCOL_VERSION,
                binding: binding.to_string(),
                peer_name: peer_name.to_string(),
            }))
            .await?;

        let ack = time::timeout(options.connect_timeout, reader.read_frame())
            .await
            .map_err(|_| RpcError::Timeout(options.connect_timeout))??;
        match ack {
            Some(MudMessage::HelloAck(ack)) if ack.accepted => {}
            Some(MudMessage::HelloAck(ack)) => {
                return Err(RpcError::Rejected {
                    addr: addr.to_string(),
                    binding: binding.to_string(),
                    reason: ack.reject_reason,
                })
            }
            Some(_) => return Err(RpcError::UnexpectedReply("hello")),
            None => return Err(RpcError::Closed),
        }
        debug!(%addr, %binding, "bound");

        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let pending: PendingCalls = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(write_loop(writer, outbound_rx, Arc::clone(&closed)));
        let reader = tokio::spawn(read_loop(
            reader,
            outbound.clone(),
            Arc::clone(&pending),
            Arc::clone(&closed),
            binding.to_string(),
        ));

        Ok(Self {
            addr: addr.to_string(),
            binding: binding.to_string(),
            outbound,
            pending,
            call_ids: SequenceCounter::new(),
            closed,
            call_timeout: options.call_timeout,
            reader,
        })
    }

    /// Sends one request and waits for its reply.
    ///
    /// # Errors
    ///
    /// [`RpcError::Remote`] carries a domain error from the callee; any other
    /// variant is a transport failure.
    pub async fn call(&self, request: Request) -> Result<Response, RpcError> {
        let call_id = self.call_ids.next();
        let label = request.label();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            // Checked under the lock so a concurrent shutdown cannot strand us.
            if self.is_closed() {
                return Err(RpcError::Closed);
            }
            pending.insert(call_id, tx);
        }

        let msg = MudMessage::Call(CallMessage { call_id, request });
        if self.outbound.send(msg).await.is_err() {
            self.pending.lock().await.remove(&call_id);
            return Err(RpcError::Closed);
        }
        trace!(call_id, label, binding = %self.binding, "call sent");

        match time::timeout(self.call_timeout, rx).await {
            Ok(Ok(Ok(response))) => Ok(response),
            Ok(Ok(Err(domain))) => Err(RpcError::Remote(domain)),
            Ok(Err(_)) => Err(RpcError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&call_id);
                warn!(call_id, label, binding = %self.binding, "call timed out");
                Err(RpcError::Timeout(self.call_timeout))
            }
        }
    }

    /// Tells the peer this connection is finished.  Dropping the client
    /// afterwards closes the socket once the goodbye is written.
    pub async fn close(&self) {
        let _ = self
            .outbound
            .send(MudMessage::Disconnect {
                reason: DisconnectReason::Goodbye,
            })
            .await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// `host:port` this client is connected to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn binding(&self) -> &str {
        &self.binding
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        // The writer exits by itself once the last queue sender is gone; the
        // reader holds one of those senders, so it has to be stopped here.
        self.reader.abort();
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("addr", &self.addr)
            .field("binding", &self.binding)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ── Background tasks ──────────────────────────────────────────────────────────

async fn write_loop(
    mut writer: FrameWriter<tokio::net::tcp::OwnedWriteHalf>,
    mut outbound: mpsc::Receiver<MudMessage>,
    closed: Arc<AtomicBool>,
) {
    while let Some(msg) = outbound.recv().await {
        if let Err(e) = writer.write_frame(&msg).await {
            debug!("write failed: {e}");
            closed.store(true, Ordering::Release);
            break;
        }
    }
}

async fn read_loop(
    mut reader: FrameReader<OwnedReadHalf>,
    outbound: mpsc::Sender<MudMessage>,
    pending: PendingCalls,
    closed: Arc<AtomicBool>,
    binding: String,
) {
    loop {
        match reader.read_frame().await {
            Ok(Some(MudMessage::Reply(ReplyMessage { call_id, outcome }))) => {
                match pending.lock().await.remove(&call_id) {
                    // The caller may have timed out and gone away.
                    Some(waiter) => {
                        let _ = waiter.send(outcome);
                    }
                    None => debug!(call_id, %binding, "reply for unknown call dropped"),
                }
            }
            Ok(Some(MudMessage::Ping(token))) => {
                if outbound.send(MudMessage::Pong(token)).await.is_err() {
                    break;
                }
            }
            Ok(Some(MudMessage::Pong(_))) => {}
            Ok(Some(MudMessage::Disconnect { reason })) => {
                debug!(%binding, ?reason, "peer disconnected");
                break;
            }
            Ok(Some(other)) => {
                warn!(%binding, kind = ?other.message_type(), "unexpected frame from callee");
                break;
            }
            Ok(None) => {
                debug!(%binding, "connection closed by peer");
                break;
            }
            Err(e) => {
                warn!(%binding, "connection failed: {e}");
                break;
            }
        }
    }

    let mut pending = pending.lock().await;
    closed.store(true, Ordering::Release);
    // Dropping the senders wakes every waiter with `Closed`.
    pending.clear();
}
