//! The server's view of a connected player.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mud_core::PersonRef;
use thiserror::Error;

/// Why a line could not be delivered to a person.
///
/// Either variant means the person is treated as disconnected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("{person} is unreachable: {reason}")]
    Unreachable { person: String, reason: String },

    #[error("delivery to {person} timed out after {after:?}")]
    TimedOut { person: String, after: Duration },
}

/// A callable handle on one player's session.
#[async_trait]
pub trait PersonHandle: Send + Sync {
    /// The wire identity of this person.
    fn person(&self) -> &PersonRef;

    /// Pushes one line of text to the player.
    async fn tell(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Turns a [`PersonRef`] received in a call into a [`PersonHandle`].
///
/// Connecting is lazy: a handle for an unreachable person is still returned,
/// and the failure surfaces on the first `tell`.
pub trait PersonConnector: Send + Sync {
    fn connect(&self, person: &PersonRef) -> Arc<dyn PersonHandle>;
}
