//! Listener side: accepts connections and dispatches calls to bound objects.
//!
//! # Connection lifecycle
//!
//! ```text
//! accept ──► read HELLO ──► Binder::bind(binding) ──► HELLO_ACK
//!                                │ None
//!                                └──► HELLO_ACK(rejected), close
//!
//! then, until EOF / DISCONNECT / shutdown:
//!   CALL ──► spawn task ──► CallHandler::handle ──► REPLY (via writer task)
//!   PING ──► PONG
//! ```
//!
//! Every call runs on its own task, so a slow call (a broadcast to a slow
//! occupant, a cross-server `go`) never holds up other calls on the same
//! connection or on other connections.  A call that is already running when
//! its caller disconnects still runs to completion; its reply is discarded.

use std::future::pending;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mud_core::protocol::messages::{
    CallMessage, DisconnectReason, HelloAckMessage, RejectReason, ReplyMessage, Request,
    Response, PROTOCOL_VERSION,
};
use mud_core::{MudError, MudMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, trace, warn};

use crate::error::RpcError;
use crate::frame::{FrameReader, FrameWriter};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const REPLY_QUEUE: usize = 64;

/// An object that can answer remote calls.
#[async_trait]
pub trait CallHandler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Response, MudError>;
}

/// Maps binding names to the objects that answer them.
pub trait Binder: Send + Sync {
    /// Returns the handler for `binding`, or `None` if nothing is bound
    /// under that name on this host.
    fn bind(&self, binding: &str) -> Option<Arc<dyn CallHandler>>;
}

/// A bound TCP listener that has not started accepting yet.
pub struct RpcServer {
    listener: TcpListener,
    binder: Arc<dyn Binder>,
}

impl RpcServer {
    /// Binds the listening socket.  Use port 0 to let the OS choose.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Bind`] if the address is in use or invalid.
    pub async fn bind(addr: &str, binder: Arc<dyn Binder>) -> Result<Self, RpcError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RpcError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self { listener, binder })
    }

    /// The address actually bound, including an OS-chosen port.
    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` becomes `true`.
    ///
    /// Open connections are told [`DisconnectReason::Shutdown`] and closed.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("rpc listener on {addr}");
        }
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let binder = Arc::clone(&self.binder);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, peer, binder, shutdown).await {
                                debug!(%peer, "connection ended: {e}");
                            }
                        });
                    }
                    Err(e) => warn!("accept failed: {e}"),
                },
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }
        info!("rpc listener stopped");
    }

    /// Runs [`serve`](Self::serve) on a background task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.serve(shutdown))
    }
}

/// Resolves once shutdown is requested.  A dropped sender can never request
/// it, so in that case this never resolves.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            pending::<()>().await;
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    binder: Arc<dyn Binder>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), RpcError> {
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    // ── Handshake ─────────────────────────────────────────────────────────────

    let hello = match time::timeout(HANDSHAKE_TIMEOUT, reader.read_frame()).await {
        Ok(Ok(Some(MudMessage::Hello(hello)))) => hello,
        Ok(Ok(Some(_))) => return Err(RpcError::UnexpectedReply("hello")),
        Ok(Ok(None)) => return Ok(()),
        Ok(Err(e)) => return Err(e),
        Err(_) => return Err(RpcError::Timeout(HANDSHAKE_TIMEOUT)),
    };

    if hello.protocol_version != PROTOCOL_VERSION {
        warn!(%peer, version = hello.protocol_version, "protocol version mismatch");
        let ack = HelloAckMessage::reject(RejectReason::VersionMismatch);
        writer.write_frame(&MudMessage::HelloAck(ack)).await?;
        return Ok(());
    }

    let Some(handler) = binder.bind(&hello.binding) else {
        info!(%peer, binding = %hello.binding, "rejected unknown binding");
        let ack = HelloAckMessage::reject(RejectReason::UnknownBinding);
        writer.write_frame(&MudMessage::HelloAck(ack)).await?;
        return Ok(());
    };

    writer
        .write_frame(&MudMessage::HelloAck(HelloAckMessage::accept()))
        .await?;
    debug!(%peer, binding = %hello.binding, peer_name = %hello.peer_name, "connection bound");

    // ── Call loop ─────────────────────────────────────────────────────────────

    let (replies, mut replies_rx) = mpsc::channel::<MudMessage>(REPLY_QUEUE);
    tokio::spawn(async move {
        while let Some(msg) = replies_rx.recv().await {
            if let Err(e) = writer.write_frame(&msg).await {
                debug!(%peer, "reply write failed: {e}");
                break;
            }
        }
    });

    loop {
        let frame = tokio::select! {
            frame = reader.read_frame() => frame,
            _ = wait_for_shutdown(&mut shutdown) => {
                let _ = replies
                    .send(MudMessage::Disconnect { reason: DisconnectReason::Shutdown })
                    .await;
                break;
            }
        };

        match frame {
            Ok(Some(MudMessage::Call(call))) => {
                tokio::spawn(run_call(call, Arc::clone(&handler), replies.clone()));
            }
            Ok(Some(MudMessage::Ping(token))) => {
                let _ = replies.send(MudMessage::Pong(token)).await;
            }
            Ok(Some(MudMessage::Pong(_))) => {}
            Ok(Some(MudMessage::Disconnect { reason })) => {
                debug!(%peer, ?reason, "peer said goodbye");
                break;
            }
            Ok(Some(other)) => {
                warn!(%peer, kind = ?other.message_type(), "unexpected frame from caller");
                let _ = replies
                    .send(MudMessage::Disconnect { reason: DisconnectReason::ProtocolError })
                    .await;
                break;
            }
            Ok(None) => break,
            Err(e) => {
                warn!(%peer, "dropping connection: {e}");
                let _ = replies
                    .send(MudMessage::Disconnect { reason: DisconnectReason::ProtocolError })
                    .await;
                break;
            }
        }
    }
    debug!(%peer, binding = %hello.binding, "connection closed");
    Ok(())
}

async fn run_call(
    call: CallMessage,
    handler: Arc<dyn CallHandler>,
    replies: mpsc::Sender<MudMessage>,
) {
    let CallMessage { call_id, request } = call;
    let label = request.label();
    trace!(call_id, label, "dispatch");
    let outcome = handler.handle(request).await;
    if let Err(e) = &outcome {
        debug!(call_id, label, "call refused: {e}");
    }
    // The caller may be gone; the call still ran.
    let _ = replies
        .send(MudMessage::Reply(ReplyMessage { call_id, outcome }))
        .await;
}
