//! Resolution of places that live on other servers.
//!
//! A cross-server exit stores only a [`PlaceAddress`].  Each time someone
//! walks through it the place opens a fresh link: look the world up on the
//! remote host, then ask that world for the place.  Nothing is cached, so a
//! remote server that restarted or moved a place is picked up on the next
//! attempt.

use async_trait::async_trait;
use mud_core::{MudError, PersonRef, PlaceAddress};
use thiserror::Error;

/// Why a remote place could not be reached or refused a call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Host down, connection reset, unknown world, timeout.
    #[error("{0}")]
    Unreachable(String),

    /// The remote world answered with a domain error.
    #[error(transparent)]
    Refused(MudError),
}

/// Opens places on other servers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldLink: Send + Sync {
    /// Looks up `target.world` on `target.host` and resolves `target.place`.
    async fn open(&self, target: &PlaceAddress) -> Result<Box<dyn RemotePlace>, LinkError>;
}

/// A place resolved through a [`WorldLink`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemotePlace: Send + Sync {
    /// Canonical address as reported by the owning server.
    fn address(&self) -> PlaceAddress;

    async fn join(
        &self,
        person: &PersonRef,
        display_name: &str,
        greeting: Option<String>,
    ) -> Result<(), LinkError>;
}
