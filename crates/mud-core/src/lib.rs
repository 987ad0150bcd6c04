//! # mud-core
//!
//! Shared library for the distributed MUD containing the network protocol
//! codec and the domain value types that travel over it.
//!
//! This crate is used by the RPC layer, the world server, and the client.
//! It has zero dependencies on sockets or an async runtime.
//!
//! # Architecture overview (for beginners)
//!
//! A MUD ("multi-user domain") is a text world made of *places*.  Each place
//! has a description, some items, the people currently standing in it, and
//! named *exits* leading to other places.  A world is served by one server
//! process, but an exit may lead to a place hosted by a completely different
//! server: the world graph spans machines.
//!
//! This crate (`mud-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the network.  Messages are encoded
//!   into a 24-byte header followed by a payload, and decoded back into typed
//!   Rust values on the other end.
//!
//! - **`domain`** – The handles that name remote objects (`PlaceAddress`,
//!   `PersonRef`), the binding names used to look objects up on a host, and
//!   the `MudError` taxonomy every operation reports failures with.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `mud_core::PlaceAddress` instead of `mud_core::domain::address::PlaceAddress`.
pub use domain::address::{
    person_binding, world_binding, BindingTarget, PersonId, PersonRef, PlaceAddress,
    PERSON_BINDING_PREFIX, WORLD_BINDING_PREFIX,
};
pub use domain::error::MudError;
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::MudMessage;
