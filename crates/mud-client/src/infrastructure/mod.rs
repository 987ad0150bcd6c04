//! Infrastructure layer of the client.
//!
//! **Dependency rule**: this layer may depend on `application`, `mud_core`
//! and `mud_rpc`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`console`** – The terminal behind [`Console`](crate::application::session::Console),
//!   plus a scripted double for tests.
//!
//! - **`network`** – The pooled world connections behind
//!   [`Gateway`](crate::application::session::Gateway) and the person endpoint
//!   that receives notices.

pub mod console;
pub mod network;
