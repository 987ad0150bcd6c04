//! Shared fixtures: world servers and player endpoints on 127.0.0.1.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mud_core::protocol::messages::{PersonCall, Request, Response};
use mud_core::{person_binding, MudError, PersonRef};
use mud_rpc::{Binder, CallHandler, RpcOptions, RpcServer, WorldStub};
use mud_server::application::world::{MudServer, WorldServices, WorldSettings};
use mud_server::infrastructure::network::dispatcher::WorldDirectory;
use mud_server::infrastructure::network::remote_person::RpcPersonConnector;
use mud_server::infrastructure::network::remote_world::RpcWorldLink;
use mud_server::infrastructure::storage::snapshot::GzipSnapshotStore;
use tokio::sync::{watch, Mutex, Notify};
use tokio::time;
use uuid::Uuid;

pub const WAIT: Duration = Duration::from_secs(3);

pub fn options() -> RpcOptions {
    RpcOptions {
        connect_timeout: Duration::from_millis(500),
        call_timeout: Duration::from_secs(3),
    }
}

// ── World servers ─────────────────────────────────────────────────────────────

pub struct TestWorld {
    pub world: Arc<MudServer>,
    pub host: String,
    shutdown: watch::Sender<bool>,
}

impl TestWorld {
    pub async fn start(
        name: &str,
        entrance: &str,
        description: &str,
        password: Option<&str>,
    ) -> Self {
        let settings = WorldSettings {
            name: name.into(),
            password: password.map(str::to_string),
            entrance: entrance.into(),
            description: description.into(),
        };
        Self::serve(|services| async move { MudServer::create(settings, services).await.unwrap() })
            .await
    }

    pub async fn restore(path: &std::path::Path) -> Self {
        let path = path.to_path_buf();
        Self::serve(|services| async move {
            MudServer::restore_from(&path, services).await.unwrap()
        })
        .await
    }

    async fn serve<F, Fut>(build: F) -> Self
    where
        F: FnOnce(WorldServices) -> Fut,
        Fut: std::future::Future<Output = MudServer>,
    {
        let directory = Arc::new(WorldDirectory::new());
        let server = RpcServer::bind("127.0.0.1:0", Arc::clone(&directory) as Arc<dyn Binder>)
            .await
            .unwrap();
        let host = server.local_addr().unwrap().to_string();
        let services = WorldServices {
            host: host.clone(),
            persons: Arc::new(RpcPersonConnector::new(&host, options())),
            link: Arc::new(RpcWorldLink::new(&host, options())),
            store: Arc::new(GzipSnapshotStore::new()),
            delivery_timeout: Duration::from_millis(500),
        };
        let world = Arc::new(build(services).await);
        directory.insert(Arc::clone(&world));
        let (shutdown, rx) = watch::channel(false);
        server.spawn(rx);
        Self {
            world,
            host,
            shutdown,
        }
    }

    pub async fn stub(&self) -> WorldStub {
        WorldStub::connect(&self.host, self.world.name(), "test-client", options())
            .await
            .unwrap()
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

// ── Player endpoints ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Inbox {
    lines: Mutex<Vec<String>>,
    changed: Notify,
}

struct InboxHandler {
    name: String,
    inbox: Arc<Inbox>,
}

#[async_trait]
impl CallHandler for InboxHandler {
    async fn handle(&self, request: Request) -> Result<Response, MudError> {
        match request {
            Request::Person(PersonCall::Name) => Ok(Response::Text(self.name.clone())),
            Request::Person(PersonCall::Description) => Ok(Response::Text("A tester".into())),
            Request::Person(PersonCall::Tell { text }) => {
                self.inbox.lines.lock().await.push(text);
                self.inbox.changed.notify_waiters();
                Ok(Response::Unit)
            }
            _ => Err(MudError::BadRequest("not a world".into())),
        }
    }
}

struct OnePerson {
    binding: String,
    handler: Arc<InboxHandler>,
}

impl Binder for OnePerson {
    fn bind(&self, binding: &str) -> Option<Arc<dyn CallHandler>> {
        (binding == self.binding).then(|| Arc::clone(&self.handler) as Arc<dyn CallHandler>)
    }
}

/// A player's person endpoint that records every notice.
pub struct Player {
    pub person: PersonRef,
    pub name: String,
    inbox: Arc<Inbox>,
    shutdown: watch::Sender<bool>,
}

impl Player {
    pub async fn start(name: &str) -> Self {
        let id = Uuid::new_v4();
        let inbox = Arc::new(Inbox::default());
        let binder = OnePerson {
            binding: person_binding(&id),
            handler: Arc::new(InboxHandler {
                name: name.to_string(),
                inbox: Arc::clone(&inbox),
            }),
        };
        let server = RpcServer::bind("127.0.0.1:0", Arc::new(binder)).await.unwrap();
        let endpoint = server.local_addr().unwrap().to_string();
        let (shutdown, rx) = watch::channel(false);
        server.spawn(rx);
        Self {
            person: PersonRef::new(id, endpoint),
            name: name.to_string(),
            inbox,
            shutdown,
        }
    }

    /// Takes the endpoint down, as if the player's process had died, and
    /// waits until it refuses connections.
    pub async fn disconnect(&self) {
        let _ = self.shutdown.send(true);
        let endpoint = self.person.endpoint.clone();
        let refused = eventually(|| {
            let endpoint = endpoint.clone();
            async move { tokio::net::TcpStream::connect(endpoint).await.is_err() }
        })
        .await;
        assert!(refused, "person endpoint still accepting connections");
    }

    pub async fn lines(&self) -> Vec<String> {
        self.inbox.lines.lock().await.clone()
    }

    pub async fn wait_for(&self, line: &str) -> bool {
        let deadline = time::Instant::now() + WAIT;
        loop {
            let notified = self.inbox.changed.notified();
            if self.inbox.lines.lock().await.iter().any(|l| l == line) {
                return true;
            }
            if time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }
}

/// Polls `check` until it returns `true` or [`WAIT`] elapses.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = time::Instant::now() + WAIT;
    while time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        time::sleep(Duration::from_millis(20)).await;
    }
    false
}
