//! mud-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does mud-client do? (for beginners)
//!
//! The client is the player's terminal.  It:
//!
//! 1. Starts a small RPC listener of its own, the *person endpoint*, bound as
//!    `person.<uuid>`.  World servers call `Tell` on it to push notices
//!    ("Bob has arrived."), and other players call `Name`/`Description` on it.
//! 2. Connects to a world server, asks for the entrance, and joins it.
//! 3. Reads commands from the terminal and turns each one into a call on
//!    the place the player is standing in.  `go` returns the next place,
//!    which may live on a different server.

/// Application layer: command vocabulary and the session loop.
pub mod application;

/// Infrastructure layer: server connections, person endpoint, terminal.
pub mod infrastructure;
