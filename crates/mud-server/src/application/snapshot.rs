//! Serializable form of a world and the seam that persists it.
//!
//! A snapshot holds every place's description, items, and exits.  It never
//! holds occupants: a restored world always starts empty.  Exits to places
//! in the same world are stored by place name and re-wired on restore;
//! exits to other servers are stored as full addresses.

use std::path::Path;

use mud_core::PlaceAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bumped whenever the record layout changes incompatibly.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode snapshot: {0}")]
    Encode(String),

    #[error("could not decode snapshot: {0}")]
    Decode(String),

    #[error("snapshot format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The records are readable but do not describe a valid world.
    #[error("snapshot is inconsistent: {0}")]
    Inconsistent(String),
}

/// A whole world minus its occupants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub format_version: u32,
    pub world: String,
    pub password: Option<String>,
    /// Name of the entrance place; must appear in `places`.
    pub entrance: String,
    pub places: Vec<PlaceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    pub description: String,
    pub items: Vec<ItemRecord>,
    pub exits: Vec<ExitRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRecord {
    pub name: String,
    pub target: ExitTargetRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitTargetRecord {
    /// A place in the same world, by name.
    Local { place: String },
    /// A place on another server.
    Remote(PlaceAddress),
}

/// Durable storage for snapshots.
///
/// Implementations block; callers on the async runtime run them through
/// `spawn_blocking`.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, path: &Path, snapshot: &WorldSnapshot) -> Result<(), SnapshotError>;

    fn load(&self, path: &Path) -> Result<WorldSnapshot, SnapshotError>;
}
