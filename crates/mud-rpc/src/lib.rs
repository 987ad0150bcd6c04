//! # mud-rpc
//!
//! The remote-object layer of the distributed MUD: how one process calls a
//! method on an object that lives in another process.
//!
//! # How a remote call works (for beginners)
//!
//! 1. The caller opens a TCP connection to the host that owns the object and
//!    sends `Hello { binding }`, naming the object (`mud.Lobby`,
//!    `person.<uuid>`).  The host looks the binding up with its [`Binder`] and
//!    answers `HelloAck`.
//! 2. Each method call becomes a `Call { call_id, request }` frame.  The host
//!    runs the call on its own task and answers `Reply { call_id, outcome }`.
//!    Many calls may be in flight on one connection at once; replies are
//!    matched back to callers by `call_id`, not by arrival order.
//! 3. A domain failure (`NoSuchExit`, ...) travels back inside the reply and
//!    surfaces as [`RpcError::Remote`].  Everything else (refused connection,
//!    reset, timeout) is a *transport* failure; see [`RpcError::is_transport`].
//!
//! The typed stubs in [`stubs`] wrap the raw request vocabulary so callers
//! write `place.say(&me, "hi")` instead of building `Request` values.

pub mod client;
pub mod error;
pub mod frame;
pub mod server;
pub mod stubs;

pub use client::{RpcClient, RpcOptions};
pub use error::RpcError;
pub use server::{Binder, CallHandler, RpcServer};
pub use stubs::{PersonStub, PlaceStub, WorldStub};
