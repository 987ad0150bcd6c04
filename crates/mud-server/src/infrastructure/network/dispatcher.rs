//! Routes incoming RPC calls to hosted worlds and their places.
//!
//! One listener may host several worlds.  [`WorldDirectory`] answers the
//! handshake: `mud.<world>` binds to that world's [`WorldCallHandler`], every
//! other binding is rejected.  The handler then maps each request onto the
//! matching `MudServer` or `Place` operation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use mud_core::protocol::messages::{PlaceCall, Request, Response};
use mud_core::{BindingTarget, MudError};
use mud_rpc::{Binder, CallHandler};

use crate::application::place::Place;
use crate::application::world::MudServer;

/// The worlds served on this listener, by name.
#[derive(Default)]
pub struct WorldDirectory {
    worlds: RwLock<HashMap<String, Arc<MudServer>>>,
}

impl WorldDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `world` reachable as `mud.<name>`, replacing any world of the
    /// same name.
    pub fn insert(&self, world: Arc<MudServer>) {
        let mut worlds = self.worlds.write().unwrap_or_else(|e| e.into_inner());
        worlds.insert(world.name().to_string(), world);
    }

    pub fn get(&self, name: &str) -> Option<Arc<MudServer>> {
        let worlds = self.worlds.read().unwrap_or_else(|e| e.into_inner());
        worlds.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let worlds = self.worlds.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<_> = worlds.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Binder for WorldDirectory {
    fn bind(&self, binding: &str) -> Option<Arc<dyn CallHandler>> {
        match BindingTarget::parse(binding)? {
            BindingTarget::World(name) => self
                .get(&name)
                .map(|world| Arc::new(WorldCallHandler::new(world)) as Arc<dyn CallHandler>),
            BindingTarget::Person(_) => None,
        }
    }
}

/// Answers calls addressed to one world.
pub struct WorldCallHandler {
    world: Arc<MudServer>,
}

impl WorldCallHandler {
    pub fn new(world: Arc<MudServer>) -> Self {
        Self { world }
    }
}

#[async_trait]
impl CallHandler for WorldCallHandler {
    async fn handle(&self, request: Request) -> Result<Response, MudError> {
        match request {
            Request::Entrance => Ok(Response::Place(self.world.entrance_address())),
            Request::ResolvePlace { name } => {
                let place = self.world.resolve_place(&name).await?;
                Ok(Response::Place(place.address()))
            }
            Request::WorldName => Ok(Response::Text(self.world.name().to_string())),
            Request::Dump { password, path } => {
                self.world.dump(&password, &path).await?;
                Ok(Response::Unit)
            }
            Request::Place { place, call } => {
                let place = self.world.resolve_place(&place).await?;
                dispatch_place(&place, call).await
            }
            Request::Person(_) => Err(MudError::BadRequest(
                "person calls are not served by a world".to_string(),
            )),
        }
    }
}

async fn dispatch_place(place: &Place, call: PlaceCall) -> Result<Response, MudError> {
    let response = match call {
        PlaceCall::Describe => Response::Text(place.describe().await),
        PlaceCall::ListItems => Response::Names(place.list_items().await),
        PlaceCall::ListOccupants => Response::Names(place.list_occupants().await),
        PlaceCall::ListExits => Response::Names(place.list_exits().await),
        PlaceCall::LookupOccupant { name } => Response::Person(place.lookup_occupant(&name).await?),
        PlaceCall::InspectItem { name } => Response::Text(place.inspect_item(&name).await?),
        PlaceCall::Go { person, exit } => Response::Place(place.go(&person, &exit).await?),
        PlaceCall::Say { person, text } => {
            place.say(&person, &text).await?;
            Response::Unit
        }
        PlaceCall::Act { person, text } => {
            place.act(&person, &text).await?;
            Response::Unit
        }
        PlaceCall::CreateItem {
            person,
            name,
            description,
        } => {
            place.create_item(&person, &name, &description).await?;
            Response::Unit
        }
        PlaceCall::DestroyItem { person, name } => {
            place.destroy_item(&person, &name).await?;
            Response::Unit
        }
        PlaceCall::CreateExit {
            person,
            exit,
            return_exit,
            place: new_place,
            description,
        } => {
            place
                .create_exit(&person, &exit, &return_exit, &new_place, &description)
                .await?;
            Response::Unit
        }
        PlaceCall::LinkExit {
            person,
            exit,
            target,
        } => {
            place.link_exit(&person, &exit, target).await?;
            Response::Unit
        }
        PlaceCall::CloseExit { person, exit } => {
            place.close_exit(&person, &exit).await?;
            Response::Unit
        }
        PlaceCall::Leave { person, farewell } => {
            place.leave(&person, farewell).await;
            Response::Unit
        }
        PlaceCall::Join {
            person,
            display_name,
            greeting,
        } => {
            place.join(&person, &display_name, greeting).await?;
            Response::Unit
        }
    };
    Ok(response)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::application::link::MockWorldLink;
    use crate::application::person::PersonConnector;
    use crate::application::world::{WorldServices, WorldSettings};
    use crate::infrastructure::network::mock::MemoryPersonConnector;
    use crate::infrastructure::storage::snapshot::GzipSnapshotStore;
    use mud_core::{person_binding, world_binding, PersonRef, PlaceAddress};
    use uuid::Uuid;

    async fn lobby() -> Arc<MudServer> {
        let services = WorldServices {
            host: "127.0.0.1:24900".into(),
            persons: Arc::new(MemoryPersonConnector::new()) as Arc<dyn PersonConnector>,
            link: Arc::new(MockWorldLink::new()),
            store: Arc::new(GzipSnapshotStore::new()),
            delivery_timeout: Duration::from_millis(200),
        };
        let settings = WorldSettings {
            name: "Lobby".into(),
            password: None,
            entrance: "Lobby".into(),
            description: "Welcome".into(),
        };
        Arc::new(MudServer::create(settings, services).await.unwrap())
    }

    #[tokio::test]
    async fn test_directory_binds_only_hosted_worlds() {
        // Arrange
        let directory = WorldDirectory::new();
        directory.insert(lobby().await);

        // Assert
        assert!(directory.bind(&world_binding("Lobby")).is_some());
        assert!(directory.bind(&world_binding("Dungeon")).is_none());
        assert!(directory.bind(&person_binding(&Uuid::new_v4())).is_none());
        assert!(directory.bind("Lobby").is_none());
        assert_eq!(directory.names(), vec!["Lobby"]);
    }

    #[tokio::test]
    async fn test_entrance_and_resolve() {
        let handler = WorldCallHandler::new(lobby().await);
        let lobby = PlaceAddress::new("127.0.0.1:24900", "Lobby", "Lobby");

        assert_eq!(
            handler.handle(Request::Entrance).await,
            Ok(Response::Place(lobby.clone()))
        );
        assert_eq!(
            handler
                .handle(Request::ResolvePlace {
                    name: "Lobby".into()
                })
                .await,
            Ok(Response::Place(lobby))
        );
        assert_eq!(
            handler
                .handle(Request::ResolvePlace {
                    name: "Attic".into()
                })
                .await,
            Err(MudError::NoSuchPlace("Attic".into()))
        );
    }

    #[tokio::test]
    async fn test_place_calls_reach_the_named_place() {
        // Arrange
        let handler = WorldCallHandler::new(lobby().await);
        let alice = PersonRef::new(Uuid::new_v4(), "127.0.0.1:1");
        let call = |call| Request::Place {
            place: "Lobby".into(),
            call,
        };

        // Act
        handler
            .handle(call(PlaceCall::Join {
                person: alice.clone(),
                display_name: "Alice".into(),
                greeting: None,
            }))
            .await
            .unwrap();
        let occupants = handler.handle(call(PlaceCall::ListOccupants)).await;
        let missing = handler
            .handle(call(PlaceCall::InspectItem {
                name: "lamp".into(),
            }))
            .await;

        // Assert
        assert_eq!(occupants, Ok(Response::Names(vec!["Alice".into()])));
        assert_eq!(missing, Err(MudError::NoSuchThing("lamp".into())));
    }

    #[tokio::test]
    async fn test_person_requests_are_refused() {
        let handler = WorldCallHandler::new(lobby().await);

        let result = handler
            .handle(Request::Person(mud_core::protocol::messages::PersonCall::Name))
            .await;

        assert!(matches!(result, Err(MudError::BadRequest(_))));
    }
}
