//! Scripted sessions against a real world server on 127.0.0.1.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mud_core::PersonRef;

use mud_client::application::session::{Gateway, MudSession, Profile, SessionError, SharedProfile};
use mud_client::infrastructure::console::mock::ScriptedConsole;
use mud_client::infrastructure::network::{PersonEndpoint, ServerPool};
use mud_rpc::{Binder, PersonStub, RpcError, RpcOptions, RpcServer, WorldStub};
use mud_server::application::world::{MudServer, WorldServices, WorldSettings};
use mud_server::infrastructure::network::dispatcher::WorldDirectory;
use mud_server::infrastructure::network::remote_person::RpcPersonConnector;
use mud_server::infrastructure::network::remote_world::RpcWorldLink;
use mud_server::infrastructure::storage::snapshot::GzipSnapshotStore;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time;
use tokio_test::assert_ok;

fn options() -> RpcOptions {
    RpcOptions {
        connect_timeout: Duration::from_millis(500),
        call_timeout: Duration::from_secs(3),
    }
}

struct World {
    server: Arc<MudServer>,
    host: String,
    _shutdown: watch::Sender<bool>,
}

async fn start_world(name: &str, password: Option<&str>) -> World {
    let directory = Arc::new(WorldDirectory::new());
    let rpc = RpcServer::bind("127.0.0.1:0", Arc::clone(&directory) as Arc<dyn Binder>)
        .await
        .unwrap();
    let host = rpc.local_addr().unwrap().to_string();
    let services = WorldServices {
        host: host.clone(),
        persons: Arc::new(RpcPersonConnector::new(&host, options())),
        link: Arc::new(RpcWorldLink::new(&host, options())),
        store: Arc::new(GzipSnapshotStore::new()),
        delivery_timeout: Duration::from_millis(500),
    };
    let settings = WorldSettings {
        name: name.into(),
        password: password.map(str::to_string),
        entrance: name.into(),
        description: "Welcome".into(),
    };
    let server = Arc::new(MudServer::create(settings, services).await.unwrap());
    directory.insert(Arc::clone(&server));
    let (shutdown, rx) = watch::channel(false);
    rpc.spawn(rx);
    World {
        server,
        host,
        _shutdown: shutdown,
    }
}

struct Player {
    endpoint: PersonEndpoint,
    notices: mpsc::UnboundedReceiver<String>,
    received: Vec<String>,
    profile: SharedProfile,
    gateway: Arc<dyn Gateway>,
}

impl Player {
    async fn start(name: &str, description: &str) -> Self {
        let profile = Arc::new(RwLock::new(Profile {
            name: name.into(),
            description: description.into(),
        }));
        let (endpoint, notices) =
            PersonEndpoint::start("127.0.0.1:0", "127.0.0.1", Arc::clone(&profile))
                .await
                .unwrap();
        Self {
            endpoint,
            notices,
            received: Vec::new(),
            profile,
            gateway: Arc::new(ServerPool::new(name, options())),
        }
    }

    async fn enter(
        &self,
        world: &World,
        script: &[&str],
    ) -> Result<MudSession<ScriptedConsole>, SessionError> {
        MudSession::enter(
            ScriptedConsole::new(script.iter().copied()),
            Arc::clone(&self.gateway),
            self.endpoint.person().clone(),
            Arc::clone(&self.profile),
            &world.host,
            world.server.name(),
        )
        .await
    }

    /// Waits until `line` has been delivered to this player.
    async fn heard(&mut self, line: &str) -> bool {
        if self.received.iter().any(|l| l == line) {
            return true;
        }
        let wait = async {
            while let Some(notice) = self.notices.recv().await {
                let found = notice == line;
                self.received.push(notice);
                if found {
                    return true;
                }
            }
            false
        };
        time::timeout(Duration::from_secs(3), wait).await.unwrap_or(false)
    }
}

#[tokio::test]
async fn test_build_and_walk() {
    // Arrange
    let world = start_world("Lobby", None).await;
    let mut alice = Player::start("Alice", "A curious traveller").await;
    let session = assert_ok!(
        alice
            .enter(
                &world,
                &[
                    "create lamp",
                    "A brass lamp",
                    "examine lamp",
                    "open north",
                    "Garden",
                    "A quiet garden",
                    "south",
                    "go north",
                    "say Hello",
                    "quit",
                ],
            )
            .await
    );

    // Act
    let console = session.run().await;

    // Assert
    assert!(console.printed("You are in: Lobby of the world: Lobby"));
    assert!(console.printed("A brass lamp"));
    assert!(console.printed("You are in: Garden of the world: Lobby"));
    assert!(console.printed("A quiet garden"));
    assert!(console.printed("Exits are: south"));
    assert!(console.printed("Bye."));
    assert!(console.prompts().iter().any(|p| p.starts_with("Please describe the lamp")));
    assert!(alice.heard("Alice has created a lamp.").await);
    assert!(alice.heard("Alice: Hello").await);
    assert_eq!(world.server.place_count().await, 2);
}

#[tokio::test]
async fn test_errors_are_explained_and_session_continues() {
    let world = start_world("Lobby", None).await;
    let alice = Player::start("Alice", "").await;
    let session = alice
        .enter(&world, &["go up", "destroy sofa", "dance", "examine", "lamp", "look"])
        .await
        .unwrap();

    let console = session.run().await;

    assert!(console.printed("There is no exit up."));
    assert!(console.printed("There is no sofa here."));
    assert!(console.printed("There is no lamp here."));
    assert!(console.printed("unknown command 'dance'; type 'help' for a list"));
    let looks = console
        .output()
        .iter()
        .filter(|l| l.starts_with("You are in:"))
        .count();
    assert_eq!(looks, 2);
}

#[tokio::test]
async fn test_talk_describe_and_quit_between_players() {
    // Arrange: Bob is already in the lobby
    let world = start_world("Lobby", None).await;
    let alice = Player::start("Alice", "A curious traveller").await;
    let mut bob = Player::start("Bob", "A tall stranger").await;
    let bob_session = bob.enter(&world, &[]).await.unwrap();

    // Act
    let alice_session = alice
        .enter(&world, &["describe Bob", "talk Bob", "Nice hat", "change", "Tired"])
        .await
        .unwrap();
    let console = alice_session.run().await;

    // Assert
    assert!(console.printed("Bob: A tall stranger"));
    assert!(console.printed("Your description has been changed."));
    assert_eq!(alice.profile.read().await.description, "Tired");
    assert!(bob.heard("Alice has arrived.").await);
    assert!(bob.heard("Alice tells you: Nice hat").await);
    assert!(bob.heard("Alice has quit.").await);
    assert_eq!(bob_session.place().place, "Lobby");
}

#[tokio::test]
async fn test_name_already_in_use() {
    let world = start_world("Lobby", None).await;
    let first = Player::start("Alice", "").await;
    let second = Player::start("Alice", "").await;
    let _session = first.enter(&world, &[]).await.unwrap();

    let result = second.enter(&world, &[]).await;

    assert!(matches!(result, Err(SessionError::NameTaken(name)) if name == "Alice"));
}

#[tokio::test]
async fn test_unreachable_world() {
    let dead = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let alice = Player::start("Alice", "").await;

    let result = MudSession::enter(
        ScriptedConsole::default(),
        Arc::clone(&alice.gateway),
        alice.endpoint.person().clone(),
        Arc::clone(&alice.profile),
        &dead,
        "Lobby",
    )
    .await;

    assert!(matches!(result, Err(SessionError::Unreachable { .. })));
}

#[tokio::test]
async fn test_dump_prompts_for_password() {
    let world = start_world("Lobby", Some("secret")).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lobby.mud");
    let path = path.to_str().unwrap();
    let alice = Player::start("Alice", "").await;
    let dump = format!("dump {path}");
    let session = alice
        .enter(&world, &[dump.as_str(), "guess", dump.as_str(), "secret"])
        .await
        .unwrap();

    let console = session.run().await;

    assert!(console.printed("Wrong password."));
    assert!(console.printed(&format!("World saved to {path}.")));
    assert!(std::path::Path::new(path).exists());
}

#[tokio::test]
async fn test_link_walks_to_another_server() {
    // Arrange
    let lobby = start_world("Lobby", None).await;
    let dungeon = start_world("Dungeon", None).await;
    let alice = Player::start("Alice", "").await;
    let session = alice
        .enter(
            &lobby,
            &[
                "link portal",
                dungeon.host.as_str(),
                "Dungeon",
                "Dungeon",
                "go portal",
            ],
        )
        .await
        .unwrap();

    // Act
    let console = session.run().await;

    // Assert
    assert!(console.printed("You are in: Dungeon of the world: Dungeon"));
    let occupants = lobby.server.entrance().list_occupants().await;
    assert!(occupants.is_empty());
}

/// Refuses the first connection to one world, then behaves like the pool.
struct FirstConnectFails {
    pool: ServerPool,
    world: String,
    failed: AtomicBool,
}

#[async_trait]
impl Gateway for FirstConnectFails {
    async fn world(&self, host: &str, world: &str) -> Result<WorldStub, RpcError> {
        if world == self.world && !self.failed.swap(true, Ordering::SeqCst) {
            return Err(RpcError::Closed);
        }
        self.pool.world(host, world).await
    }

    async fn person(&self, person: &PersonRef) -> Result<PersonStub, RpcError> {
        self.pool.person(person).await
    }
}

#[tokio::test]
async fn test_lost_connection_after_go_is_recovered_on_next_command() {
    // Arrange: the move succeeds on the server but the client cannot open
    // the destination world the first time
    let lobby = start_world("Lobby", None).await;
    let dungeon = start_world("Dungeon", None).await;
    let mut alice = Player::start("Alice", "").await;
    alice.gateway = Arc::new(FirstConnectFails {
        pool: ServerPool::new("Alice", options()),
        world: "Dungeon".into(),
        failed: AtomicBool::new(false),
    });
    let session = alice
        .enter(
            &lobby,
            &[
                "link portal",
                dungeon.host.as_str(),
                "Dungeon",
                "Dungeon",
                "go portal",
                "say Still here",
            ],
        )
        .await
        .unwrap();

    // Act
    let console = session.run().await;

    // Assert
    assert!(console
        .output()
        .iter()
        .any(|l| l.starts_with("Could not reach the server")));
    assert!(console.prompts().iter().any(|p| p == "Dungeon:Dungeon> "));
    assert!(!console.output().iter().any(|l| l.starts_with("You are not in that place")));
    assert!(alice.heard("Alice: Still here").await);
    // Quitting from the dungeon left nobody behind in either world.
    assert!(lobby.server.entrance().list_occupants().await.is_empty());
    assert!(dungeon.server.entrance().list_occupants().await.is_empty());
}
