//! Loopback tests: a real `RpcServer` on 127.0.0.1 and real clients.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use mud_core::protocol::messages::{PlaceCall, RejectReason, Request, Response};
use mud_core::{world_binding, MudError, PersonRef, PlaceAddress};
use mud_rpc::{Binder, CallHandler, RpcClient, RpcError, RpcOptions, RpcServer, WorldStub};
use tokio::sync::watch;
use tokio_test::assert_ok;
use uuid::Uuid;

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// Answers a tiny fixed world called "Echo".
#[derive(Default)]
struct EchoWorld {
    host: OnceLock<String>,
}

#[async_trait]
impl CallHandler for EchoWorld {
    async fn handle(&self, request: Request) -> Result<Response, MudError> {
        match request {
            Request::WorldName => Ok(Response::Text("Echo".into())),
            Request::Entrance => Ok(Response::Place(PlaceAddress::new(
                self.host.get().cloned().unwrap_or_default(),
                "Echo",
                "Hall",
            ))),
            // Deliberately the wrong shape.
            Request::ResolvePlace { .. } => Ok(Response::Unit),
            Request::Place { place, call } => match call {
                PlaceCall::Describe => Ok(Response::Text(format!("The {place}."))),
                PlaceCall::Say { text, .. } if text == "slow" => {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok(Response::Unit)
                }
                PlaceCall::Say { .. } => Ok(Response::Unit),
                PlaceCall::Go { exit, .. } => Err(MudError::NoSuchExit(exit)),
                _ => Err(MudError::BadRequest("unsupported".into())),
            },
            _ => Err(MudError::BadRequest("unsupported".into())),
        }
    }
}

struct OneWorld(Arc<EchoWorld>);

impl Binder for OneWorld {
    fn bind(&self, binding: &str) -> Option<Arc<dyn CallHandler>> {
        (binding == world_binding("Echo")).then(|| Arc::clone(&self.0) as Arc<dyn CallHandler>)
    }
}

async fn start_server() -> (String, watch::Sender<bool>) {
    let world = Arc::new(EchoWorld::default());
    let server = RpcServer::bind("127.0.0.1:0", Arc::new(OneWorld(Arc::clone(&world))))
        .await
        .unwrap();
    let host = server.local_addr().unwrap().to_string();
    world.host.set(host.clone()).unwrap();
    let (tx, rx) = watch::channel(false);
    server.spawn(rx);
    (host, tx)
}

fn someone() -> PersonRef {
    PersonRef::new(Uuid::new_v4(), "127.0.0.1:1")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_world_stub_round_trip() {
    // Arrange
    let (host, _shutdown) = start_server().await;

    // Act
    let world = WorldStub::connect(&host, "Echo", "tester", RpcOptions::default())
        .await
        .unwrap();
    let name = assert_ok!(world.world_name().await);
    let entrance = assert_ok!(world.entrance().await);
    let text = assert_ok!(world.place("Hall").describe().await);

    // Assert
    assert_eq!(name, "Echo");
    assert_eq!(entrance, PlaceAddress::new(host.clone(), "Echo", "Hall"));
    assert_eq!(text, "The Hall.");
}

#[tokio::test]
async fn test_unknown_world_is_rejected_at_handshake() {
    let (host, _shutdown) = start_server().await;

    let result = WorldStub::connect(&host, "Nowhere", "tester", RpcOptions::default()).await;

    match result {
        Err(RpcError::Rejected { reason, .. }) => assert_eq!(reason, RejectReason::UnknownBinding),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_connect_error() {
    // Arrange: grab a free port, then release it so nothing listens there
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    // Act
    let result = WorldStub::connect(&addr, "Echo", "tester", RpcOptions::default()).await;

    // Assert
    let err = result.unwrap_err();
    assert!(matches!(err, RpcError::Connect { .. }));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_domain_error_travels_back_as_remote() {
    let (host, _shutdown) = start_server().await;
    let world = WorldStub::connect(&host, "Echo", "tester", RpcOptions::default())
        .await
        .unwrap();

    let err = world.place("Hall").go(&someone(), "up").await.unwrap_err();

    assert!(!err.is_transport());
    assert_eq!(err.as_domain(), Some(&MudError::NoSuchExit("up".into())));
}

#[tokio::test]
async fn test_concurrent_calls_are_matched_by_id() {
    // Arrange: one slow call and one fast call share a connection
    let (host, _shutdown) = start_server().await;
    let world = WorldStub::connect(&host, "Echo", "tester", RpcOptions::default())
        .await
        .unwrap();
    let hall = world.place("Hall");
    let who = someone();

    // Act
    let started = tokio::time::Instant::now();
    let (slow, fast) = tokio::join!(hall.say(&who, "slow"), async {
        let text = hall.describe().await;
        (text, started.elapsed())
    });

    // Assert: the fast reply did not wait behind the slow one
    assert_ok!(slow);
    let (text, fast_elapsed) = fast;
    assert_eq!(text.unwrap(), "The Hall.");
    assert!(fast_elapsed < Duration::from_millis(300));
}

#[tokio::test]
async fn test_call_timeout_is_transport_failure() {
    let (host, _shutdown) = start_server().await;
    let options = RpcOptions {
        call_timeout: Duration::from_millis(50),
        ..RpcOptions::default()
    };
    let client = RpcClient::connect(&host, &world_binding("Echo"), "tester", options)
        .await
        .unwrap();

    let result = client
        .call(Request::Place {
            place: "Hall".into(),
            call: PlaceCall::Say {
                person: someone(),
                text: "slow".into(),
            },
        })
        .await;

    assert!(matches!(result, Err(RpcError::Timeout(_))));
}

#[tokio::test]
async fn test_wrong_reply_shape_is_unexpected_reply() {
    let (host, _shutdown) = start_server().await;
    let client = RpcClient::connect(&host, &world_binding("Echo"), "tester", RpcOptions::default())
        .await
        .unwrap();
    let stub = WorldStub::from_client(Arc::new(client), &host, "Echo");

    let err = stub.resolve_place("Hall").await.unwrap_err();

    assert!(matches!(err, RpcError::UnexpectedReply("resolve_place")));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_server_shutdown_closes_clients() {
    // Arrange
    let (host, shutdown) = start_server().await;
    let world = WorldStub::connect(&host, "Echo", "tester", RpcOptions::default())
        .await
        .unwrap();
    assert_ok!(world.world_name().await);

    // Act
    shutdown.send(true).unwrap();
    let mut closed = false;
    for _ in 0..50 {
        if world.is_closed() {
            closed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Assert
    assert!(closed, "client must notice the server going away");
    assert!(matches!(world.world_name().await, Err(RpcError::Closed)));
}
