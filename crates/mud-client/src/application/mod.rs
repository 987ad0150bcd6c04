//! Application layer of the client.
//!
//! - **`commands`** – Parses one line of player input into a [`commands::Command`].
//!
//! - **`session`** – [`session::MudSession`], the loop that runs commands
//!   against the current place and explains failures.  It reaches servers
//!   through the [`session::Gateway`] trait and the terminal through
//!   [`session::Console`], both implemented in the infrastructure layer.

pub mod commands;
pub mod session;
