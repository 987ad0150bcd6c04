//! [`MudServer`]: one world, its registry, and its entrance.
//!
//! A world is bootstrapped either fresh, from a name, an optional password,
//! and an entrance, or from a snapshot written earlier by [`MudServer::dump`].
//! Either way every place starts with nobody in it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mud_core::{MudError, PlaceAddress};
use tracing::info;

use crate::application::link::WorldLink;
use crate::application::person::PersonConnector;
use crate::application::place::{Place, WorldContext};
use crate::application::registry::PlaceRegistry;
use crate::application::snapshot::{
    SnapshotError, SnapshotStore, WorldSnapshot, SNAPSHOT_FORMAT_VERSION,
};

/// Parameters of a freshly created world.
#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub name: String,
    /// Required by remote `dump` requests when set.
    pub password: Option<String>,
    pub entrance: String,
    pub description: String,
}

/// Everything a world needs from the outside.
pub struct WorldServices {
    /// `host:port` advertised in every place address.
    pub host: String,
    pub persons: Arc<dyn PersonConnector>,
    pub link: Arc<dyn WorldLink>,
    pub store: Arc<dyn SnapshotStore>,
    pub delivery_timeout: Duration,
}

impl WorldServices {
    fn context(&self, world: &str) -> Arc<WorldContext> {
        Arc::new(WorldContext {
            world: world.to_string(),
            host: self.host.clone(),
            persons: Arc::clone(&self.persons),
            link: Arc::clone(&self.link),
            delivery_timeout: self.delivery_timeout,
        })
    }
}

pub struct MudServer {
    ctx: Arc<WorldContext>,
    registry: Arc<PlaceRegistry>,
    entrance: Arc<Place>,
    password: Option<String>,
    store: Arc<dyn SnapshotStore>,
}

impl MudServer {
    pub async fn create(
        settings: WorldSettings,
        services: WorldServices,
    ) -> Result<Self, MudError> {
        let ctx = services.context(&settings.name);
        let registry = Arc::new(PlaceRegistry::new());
        let entrance =
            Place::create(&settings.entrance, &settings.description, &ctx, &registry).await?;
        info!(world = %settings.name, entrance = %settings.entrance, "world created");
        Ok(Self {
            ctx,
            registry,
            entrance,
            password: settings.password,
            store: services.store,
        })
    }

    /// Rebuilds a world from `snapshot`.
    ///
    /// Places are created first and exits wired second, so exits may point
    /// at places listed later in the snapshot.
    pub async fn restore(
        snapshot: WorldSnapshot,
        services: WorldServices,
    ) -> Result<Self, SnapshotError> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }

        let ctx = services.context(&snapshot.world);
        let registry = Arc::new(PlaceRegistry::new());

        let mut places = Vec::with_capacity(snapshot.places.len());
        for record in &snapshot.places {
            let place = Place::create(&record.name, &record.description, &ctx, &registry)
                .await
                .map_err(|e| SnapshotError::Inconsistent(e.to_string()))?;
            places.push(place);
        }
        for (place, record) in places.iter().zip(&snapshot.places) {
            place.restore_contents(record, &registry).await?;
        }

        let entrance = registry.resolve(&snapshot.entrance).await.map_err(|_| {
            SnapshotError::Inconsistent(format!(
                "entrance '{}' is not among the saved places",
                snapshot.entrance
            ))
        })?;

        info!(world = %snapshot.world, places = places.len(), "world restored");
        Ok(Self {
            ctx,
            registry,
            entrance,
            password: snapshot.password,
            store: services.store,
        })
    }

    /// Loads `path` through `services.store`, then restores.
    pub async fn restore_from(path: &Path, services: WorldServices) -> Result<Self, SnapshotError> {
        let store = Arc::clone(&services.store);
        let path_buf = path.to_path_buf();
        let snapshot = tokio::task::spawn_blocking(move || store.load(&path_buf))
            .await
            .map_err(|e| SnapshotError::Decode(e.to_string()))??;
        Self::restore(snapshot, services).await
    }

    pub fn name(&self) -> &str {
        &self.ctx.world
    }

    pub fn host(&self) -> &str {
        &self.ctx.host
    }

    pub fn entrance(&self) -> &Arc<Place> {
        &self.entrance
    }

    pub fn entrance_address(&self) -> PlaceAddress {
        self.entrance.address()
    }

    pub fn address_of(&self, place: &str) -> PlaceAddress {
        self.ctx.address_of(place)
    }

    pub async fn resolve_place(&self, name: &str) -> Result<Arc<Place>, MudError> {
        self.registry.resolve(name).await
    }

    /// Adds an already-built place.  Places normally register themselves
    /// through [`Place::create`].
    pub async fn register_place(&self, place: Arc<Place>) -> Result<(), MudError> {
        self.registry.register(place).await
    }

    pub async fn place_count(&self) -> usize {
        self.registry.len().await
    }

    /// The whole place graph as it is right now.
    ///
    /// Places are read one after another without a world-wide lock, so
    /// changes made while this runs may be partially captured.
    pub async fn snapshot(&self) -> WorldSnapshot {
        let mut places = Vec::new();
        for place in self.registry.all().await {
            places.push(place.export().await);
        }
        WorldSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            world: self.ctx.world.clone(),
            password: self.password.clone(),
            entrance: self.entrance.name().to_string(),
            places,
        }
    }

    /// Writes a snapshot to `path` on this server's host after checking
    /// `password`.
    ///
    /// # Errors
    ///
    /// [`MudError::BadPassword`] on a mismatch, [`MudError::Persistence`] if
    /// the file cannot be written.
    pub async fn dump(&self, password: &str, path: &str) -> Result<(), MudError> {
        if let Some(expected) = &self.password {
            if expected != password {
                return Err(MudError::BadPassword);
            }
        }
        self.save_to(Path::new(path))
            .await
            .map_err(|e| MudError::Persistence(e.to_string()))
    }

    /// Writes a snapshot to `path` without a password check.
    pub async fn save_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let snapshot = self.snapshot().await;
        let store = Arc::clone(&self.store);
        let path: PathBuf = path.to_path_buf();
        let shown = path.display().to_string();
        tokio::task::spawn_blocking(move || store.save(&path, &snapshot))
            .await
            .map_err(|e| SnapshotError::Encode(e.to_string()))??;
        info!(world = %self.ctx.world, path = %shown, "snapshot written");
        Ok(())
    }
}

impl std::fmt::Debug for MudServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MudServer")
            .field("world", &self.ctx.world)
            .field("host", &self.ctx.host)
            .field("entrance", &self.entrance.name())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::link::MockWorldLink;
    use crate::application::snapshot::{ExitRecord, ExitTargetRecord, ItemRecord, PlaceRecord};
    use crate::infrastructure::network::mock::{MemoryPersonConnector, RecordingPerson};
    use crate::infrastructure::storage::snapshot::GzipSnapshotStore;
    use mud_core::PersonRef;
    use uuid::Uuid;

    fn world_services() -> (WorldServices, Arc<MemoryPersonConnector>) {
        let persons = Arc::new(MemoryPersonConnector::new());
        let services = WorldServices {
            host: "127.0.0.1:24900".into(),
            persons: Arc::clone(&persons) as Arc<dyn PersonConnector>,
            link: Arc::new(MockWorldLink::new()),
            store: Arc::new(GzipSnapshotStore::new()),
            delivery_timeout: Duration::from_millis(200),
        };
        (services, persons)
    }

    fn lobby_settings(password: Option<&str>) -> WorldSettings {
        WorldSettings {
            name: "Lobby".into(),
            password: password.map(str::to_string),
            entrance: "Lobby".into(),
            description: "Welcome".into(),
        }
    }

    #[tokio::test]
    async fn test_create_registers_entrance() {
        let (services, _) = world_services();

        let server = MudServer::create(lobby_settings(None), services).await.unwrap();

        assert_eq!(server.name(), "Lobby");
        assert_eq!(server.entrance().describe().await, "Welcome");
        assert_eq!(
            server.entrance_address(),
            PlaceAddress::new("127.0.0.1:24900", "Lobby", "Lobby")
        );
        assert!(server.resolve_place("Lobby").await.is_ok());
        assert_eq!(
            server.resolve_place("Garden").await.unwrap_err(),
            MudError::NoSuchPlace("Garden".into())
        );
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_drops_occupants() {
        // Arrange: a two-place world with an item, an exit pair, a remote exit
        let (services, persons) = world_services();
        let server = MudServer::create(lobby_settings(None), services).await.unwrap();
        let alice = PersonRef::new(Uuid::new_v4(), "127.0.0.1:1");
        persons.register(RecordingPerson::new(alice.clone()));
        let lobby = server.entrance();
        lobby.join(&alice, "Alice", None).await.unwrap();
        lobby.create_item(&alice, "lamp", "A brass lamp").await.unwrap();
        lobby
            .create_exit(&alice, "north", "south", "Garden", "A quiet garden")
            .await
            .unwrap();
        let snapshot = server.snapshot().await;

        // Act
        let (services, _) = world_services();
        let restored = MudServer::restore(snapshot.clone(), services).await.unwrap();

        // Assert
        assert_eq!(restored.place_count().await, 2);
        assert_eq!(restored.snapshot().await, snapshot);
        let lobby = restored.entrance();
        assert_eq!(lobby.describe().await, "Welcome");
        assert_eq!(lobby.list_items().await, vec!["lamp"]);
        assert_eq!(lobby.list_exits().await, vec!["north"]);
        assert!(lobby.list_occupants().await.is_empty());
        let garden = restored.resolve_place("Garden").await.unwrap();
        assert_eq!(garden.list_exits().await, vec!["south"]);
    }

    #[tokio::test]
    async fn test_restore_rewires_exits_to_later_places() {
        // Arrange: Lobby's exit names Garden, which is listed after it
        let snapshot = WorldSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            world: "Lobby".into(),
            password: None,
            entrance: "Lobby".into(),
            places: vec![
                PlaceRecord {
                    name: "Lobby".into(),
                    description: "Welcome".into(),
                    items: vec![],
                    exits: vec![ExitRecord {
                        name: "north".into(),
                        target: ExitTargetRecord::Local {
                            place: "Garden".into(),
                        },
                    }],
                },
                PlaceRecord {
                    name: "Garden".into(),
                    description: "Green".into(),
                    items: vec![ItemRecord {
                        name: "rose".into(),
                        description: "Red".into(),
                    }],
                    exits: vec![ExitRecord {
                        name: "portal".into(),
                        target: ExitTargetRecord::Remote(PlaceAddress::new(
                            "10.0.0.2:24900",
                            "Dungeon",
                            "Cellar",
                        )),
                    }],
                },
            ],
        };
        let (services, persons) = world_services();

        // Act
        let server = MudServer::restore(snapshot, services).await.unwrap();

        // Assert: walking north lands in the restored Garden
        let alice = PersonRef::new(Uuid::new_v4(), "127.0.0.1:1");
        persons.register(RecordingPerson::new(alice.clone()));
        server.entrance().join(&alice, "Alice", None).await.unwrap();
        let arrived = server.entrance().go(&alice, "north").await.unwrap();
        assert_eq!(arrived.place, "Garden");
        let garden = server.resolve_place("Garden").await.unwrap();
        assert_eq!(garden.inspect_item("rose").await.unwrap(), "Red");
        assert_eq!(garden.list_exits().await, vec!["portal"]);
    }

    #[tokio::test]
    async fn test_restore_rejects_missing_entrance_and_dangling_exit() {
        let mut snapshot = WorldSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            world: "Lobby".into(),
            password: None,
            entrance: "Hall".into(),
            places: vec![PlaceRecord {
                name: "Lobby".into(),
                description: "Welcome".into(),
                items: vec![],
                exits: vec![],
            }],
        };
        let (services, _) = world_services();
        assert!(matches!(
            MudServer::restore(snapshot.clone(), services).await,
            Err(SnapshotError::Inconsistent(_))
        ));

        snapshot.entrance = "Lobby".into();
        snapshot.places[0].exits.push(ExitRecord {
            name: "down".into(),
            target: ExitTargetRecord::Local {
                place: "Cellar".into(),
            },
        });
        let (services, _) = world_services();
        assert!(matches!(
            MudServer::restore(snapshot, services).await,
            Err(SnapshotError::Inconsistent(_))
        ));
    }

    #[tokio::test]
    async fn test_restore_rejects_other_format_version() {
        let snapshot = WorldSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION + 1,
            world: "Lobby".into(),
            password: None,
            entrance: "Lobby".into(),
            places: vec![],
        };
        let (services, _) = world_services();

        let result = MudServer::restore(snapshot, services).await;

        assert!(matches!(result, Err(SnapshotError::UnsupportedVersion { .. })));
    }

    #[tokio::test]
    async fn test_dump_checks_password_then_writes() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lobby.mud");
        let path_str = path.to_str().unwrap();
        let (services, _) = world_services();
        let server = MudServer::create(lobby_settings(Some("secret")), services)
            .await
            .unwrap();

        // Act / Assert
        assert_eq!(server.dump("wrong", path_str).await, Err(MudError::BadPassword));
        assert!(!path.exists());
        server.dump("secret", path_str).await.unwrap();
        assert!(path.exists());

        let (services, _) = world_services();
        let restored = MudServer::restore_from(&path, services).await.unwrap();
        assert_eq!(restored.name(), "Lobby");
        assert_eq!(restored.snapshot().await.password.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_dump_write_failure_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("lobby.mud");
        let (services, _) = world_services();
        let server = MudServer::create(lobby_settings(None), services).await.unwrap();

        let result = server.dump("", path.to_str().unwrap()).await;

        assert!(matches!(result, Err(MudError::Persistence(_))));
    }
}
