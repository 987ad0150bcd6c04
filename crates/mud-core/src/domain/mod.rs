//! Domain value types shared by every participant.
//!
//! Nothing in here performs I/O.  The types describe *which* remote object a
//! caller means (`address`) and *what went wrong* when an operation on it is
//! refused (`error`).

pub mod address;
pub mod error;

pub use address::{PersonId, PersonRef, PlaceAddress};
pub use error::MudError;
