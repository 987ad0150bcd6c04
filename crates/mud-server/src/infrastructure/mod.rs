//! Infrastructure layer of the world server.
//!
//! Contains the adapters that connect the application layer to sockets and
//! files: the RPC dispatcher, remote person and remote world proxies, the
//! gzip snapshot store, and the TOML configuration file.
//!
//! **Dependency rule**: this layer may depend on `application`, `mud_core`
//! and `mud_rpc`, but MUST NOT be imported by the `application` layer outside
//! of its tests.

pub mod network;
pub mod storage;
