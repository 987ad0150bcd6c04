//! Network side of the client.
//!
//! - **`pool`** – One connection per (host, world), shared by every place
//!   stub in that world and reopened when it drops.
//! - **`person_endpoint`** – The listener world servers call back to deliver
//!   notices to this player.

pub mod person_endpoint;
pub mod pool;

pub use person_endpoint::PersonEndpoint;
pub use pool::ServerPool;
