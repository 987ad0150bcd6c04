//! Storage infrastructure: configuration file and world snapshots.
//!
//! - **`config`** – Reads `server.toml` from the platform config directory,
//!   falling back to defaults on first run.
//! - **`snapshot`** – [`GzipSnapshotStore`](snapshot::GzipSnapshotStore), the
//!   file format behind `dump` and `--restore`.

pub mod config;
pub mod snapshot;
