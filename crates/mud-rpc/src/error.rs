//! Error type for the RPC layer.

use std::time::Duration;

use mud_core::protocol::messages::RejectReason;
use mud_core::{MudError, ProtocolError};
use thiserror::Error;

/// Everything that can go wrong with a remote call.
///
/// Only [`RpcError::Remote`] is a domain answer from the callee; every other
/// variant means the call could not be carried out at all.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Listening socket could not be bound.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connection to the remote host failed or timed out.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on an established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The remote host refused the HELLO.
    #[error("{addr} has no object bound as '{binding}' ({reason:?})")]
    Rejected {
        addr: String,
        binding: String,
        reason: RejectReason,
    },

    /// The connection went away before the reply arrived.
    #[error("connection closed")]
    Closed,

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The callee ran the call and reported a domain error.
    #[error(transparent)]
    Remote(MudError),

    /// The reply did not have the shape the request calls for.
    #[error("unexpected reply to '{0}'")]
    UnexpectedReply(&'static str),
}

impl RpcError {
    /// `true` for network and protocol failures, `false` for a domain error
    /// reported by the callee.
    pub fn is_transport(&self) -> bool {
        !matches!(self, RpcError::Remote(_))
    }

    /// Returns the domain error if this is one.
    pub fn as_domain(&self) -> Option<&MudError> {
        match self {
            RpcError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MudError> for RpcError {
    fn from(e: MudError) -> Self {
        RpcError::Remote(e)
    }
}
