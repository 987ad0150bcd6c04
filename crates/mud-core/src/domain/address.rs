//! Handles that name remote objects.
//!
//! # Bindings (for beginners)
//!
//! A single host may serve several objects on the same TCP port: one or more
//! worlds, or (on a client machine) the person endpoint of a player.  The
//! first message on every connection names the object the caller wants to
//! talk to.  That name is called a *binding* and is built from a well-known
//! prefix plus the object's own name:
//!
//! ```text
//! mud.Lobby                                   -> the world server "Lobby"
//! person.67e55044-10b1-426f-9247-bb680e5fe0c8 -> one player's endpoint
//! ```
//!
//! The prefix keeps worlds and persons from colliding with each other, and
//! with anything else a host might choose to register later.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix under which world servers are bound on a host.
pub const WORLD_BINDING_PREFIX: &str = "mud.";

/// Prefix under which person endpoints are bound on a client host.
pub const PERSON_BINDING_PREFIX: &str = "person.";

/// Opaque identity of one connected user session.
pub type PersonId = Uuid;

/// Returns the binding name for the world called `world`.
///
/// # Examples
///
/// ```rust
/// assert_eq!(mud_core::world_binding("Lobby"), "mud.Lobby");
/// ```
pub fn world_binding(world: &str) -> String {
    format!("{WORLD_BINDING_PREFIX}{world}")
}

/// Returns the binding name for the person endpoint identified by `id`.
pub fn person_binding(id: &PersonId) -> String {
    format!("{PERSON_BINDING_PREFIX}{id}")
}

/// What a binding string refers to once the prefix has been stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    /// A world server, by world name.
    World(String),
    /// A person endpoint, by person id.
    Person(PersonId),
}

impl BindingTarget {
    /// Parses a binding string.  Returns `None` for unknown prefixes, empty
    /// world names, and malformed person ids.
    pub fn parse(binding: &str) -> Option<Self> {
        if let Some(world) = binding.strip_prefix(WORLD_BINDING_PREFIX) {
            if world.is_empty() {
                return None;
            }
            return Some(BindingTarget::World(world.to_string()));
        }
        binding
            .strip_prefix(PERSON_BINDING_PREFIX)
            .and_then(|id| Uuid::parse_str(id).ok())
            .map(BindingTarget::Person)
    }
}

/// Network-wide handle of one place.
///
/// Place names are unique inside their world, so `(host, world, place)` is
/// enough to find a place from anywhere.  The same type is used both for
/// handles returned by `go`/`entrance` and for the stored destination of a
/// cross-server exit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceAddress {
    /// `host:port` of the server hosting the world.
    pub host: String,
    /// Name of the world on that host.
    pub world: String,
    /// Name of the place inside the world.
    pub place: String,
}

impl PlaceAddress {
    pub fn new(
        host: impl Into<String>,
        world: impl Into<String>,
        place: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            world: world.into(),
            place: place.into(),
        }
    }

    /// Returns `true` when both addresses live in the same world on the same host.
    pub fn same_world(&self, other: &PlaceAddress) -> bool {
        self.host == other.host && self.world == other.world
    }
}

impl fmt::Display for PlaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} at {}", self.place, self.world, self.host)
    }
}

/// Network-wide handle of one person.
///
/// `endpoint` is the `host:port` where the person's client accepts calls
/// (bound as `person.<id>`).  Two handles denote the same person when their
/// ids match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: PersonId,
    pub endpoint: String,
}

impl PersonRef {
    pub fn new(id: PersonId, endpoint: impl Into<String>) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
        }
    }

    /// The binding name this person's endpoint answers to.
    pub fn binding(&self) -> String {
        person_binding(&self.id)
    }
}

impl PartialEq for PersonRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PersonRef {}

impl std::hash::Hash for PersonRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for PersonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.endpoint)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
