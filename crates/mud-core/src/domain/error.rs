//! The domain error taxonomy.
//!
//! Every variant is an expected, caller-recoverable condition.  The type is
//! serializable because the server sends it back inside a `Reply` frame; the
//! client decodes it and explains it to the user.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a world, place, or person refused an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MudError {
    /// The acting person is not an occupant of the place being addressed.
    #[error("you are not in that place")]
    NotThere,

    /// The person or entity is already present where duplicates are forbidden.
    #[error("already there")]
    AlreadyThere,

    #[error("no person named '{0}' here")]
    NoSuchPerson(String),

    #[error("no item named '{0}' here")]
    NoSuchThing(String),

    #[error("no exit named '{0}' here")]
    NoSuchExit(String),

    #[error("no place named '{0}'")]
    NoSuchPlace(String),

    #[error("an exit named '{0}' already exists")]
    ExitAlreadyExists(String),

    #[error("a place named '{0}' already exists")]
    PlaceAlreadyExists(String),

    /// A cross-server destination could not be resolved.  Server down, unknown
    /// world, and unknown place all collapse into this one kind.
    #[error("link to {0} failed")]
    LinkFailed(String),

    #[error("bad password")]
    BadPassword,

    /// Writing or reading a snapshot failed.
    #[error("snapshot failed: {0}")]
    Persistence(String),

    /// The request was well-formed on the wire but not meaningful for the
    /// object it was sent to.
    #[error("bad request: {0}")]
    BadRequest(String),
}
