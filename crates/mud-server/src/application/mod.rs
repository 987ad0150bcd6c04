//! Application layer of the world server.
//!
//! # What lives here (for beginners)
//!
//! This layer holds the world itself: places, their items, occupants and
//! exits, and the rules for changing them.  It talks to the outside world
//! only through traits, so every rule can be tested without a socket:
//!
//! - **`person`** – [`person::PersonHandle`] is how a place pushes a line of
//!   text to a player; [`person::PersonConnector`] turns a person reference
//!   received over the wire into such a handle.
//!
//! - **`link`** – [`link::WorldLink`] resolves a place on another server for
//!   cross-server exits.
//!
//! - **`place`** – One node of the world graph and every operation on it,
//!   including the fire-and-forget broadcast to occupants.
//!
//! - **`registry`** – The world's name → place table.
//!
//! - **`snapshot`** – The serializable form of a world and the
//!   [`snapshot::SnapshotStore`] seam that writes it somewhere durable.
//!
//! - **`world`** – [`world::MudServer`], which owns the registry, the entrance,
//!   and the snapshot/restore paths.

pub mod link;
pub mod person;
pub mod place;
pub mod registry;
pub mod snapshot;
pub mod world;
