//! Network infrastructure for the world server.
//!
//! # Sub-modules
//!
//! - **`dispatcher`** – Binds `mud.<world>` names to hosted worlds and turns
//!   each incoming [`Request`](mud_core::protocol::messages::Request) into a
//!   call on the right `MudServer` or `Place`.
//!
//! - **`remote_person`** – [`PersonHandle`](crate::application::person::PersonHandle)
//!   over RPC: delivers notices by calling `Tell` on the player's endpoint.
//!
//! - **`remote_world`** – [`WorldLink`](crate::application::link::WorldLink)
//!   over RPC: resolves places on other servers for cross-server exits.
//!
//! - **`mock`** – In-memory doubles for tests.

pub mod dispatcher;
pub mod mock;
pub mod remote_person;
pub mod remote_world;
