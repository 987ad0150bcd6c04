//! The player's own listener, bound as `person.<uuid>`.
//!
//! World servers call `Tell` here to push notices; other players call
//! `Name` and `Description`.  Notices are not printed here: they go out on
//! an unbounded channel so the terminal decides when to show them.

use std::sync::Arc;

use async_trait::async_trait;
use mud_core::protocol::messages::{PersonCall, Request, Response};
use mud_core::{MudError, PersonId, PersonRef};
use mud_rpc::{Binder, CallHandler, RpcError, RpcServer};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::session::SharedProfile;

struct PersonHandler {
    profile: SharedProfile,
    notices: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl CallHandler for PersonHandler {
    async fn handle(&self, request: Request) -> Result<Response, MudError> {
        match request {
            Request::Person(PersonCall::Name) => {
                Ok(Response::Text(self.profile.read().await.name.clone()))
            }
            Request::Person(PersonCall::Description) => {
                Ok(Response::Text(self.profile.read().await.description.clone()))
            }
            Request::Person(PersonCall::Tell { text }) => {
                // A closed receiver means the terminal has gone; nothing to show it on.
                let _ = self.notices.send(text);
                Ok(Response::Unit)
            }
            other => Err(MudError::BadRequest(format!(
                "a person does not answer '{}'",
                other.label()
            ))),
        }
    }
}

struct PersonBinder {
    binding: String,
    handler: Arc<PersonHandler>,
}

impl Binder for PersonBinder {
    fn bind(&self, binding: &str) -> Option<Arc<dyn CallHandler>> {
        (binding == self.binding).then(|| Arc::clone(&self.handler) as Arc<dyn CallHandler>)
    }
}

/// A running person endpoint.
pub struct PersonEndpoint {
    person: PersonRef,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PersonEndpoint {
    /// Binds `bind` and starts answering calls.
    ///
    /// The returned [`PersonRef`] advertises `advertise_host` with the port
    /// actually bound, so `bind` may use port 0.
    ///
    /// # Errors
    ///
    /// [`RpcError::Bind`] if the address cannot be bound.
    pub async fn start(
        bind: &str,
        advertise_host: &str,
        profile: SharedProfile,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>), RpcError> {
        let id: PersonId = Uuid::new_v4();
        let (notices, rx) = mpsc::unbounded_channel();
        let binder = PersonBinder {
            binding: mud_core::person_binding(&id),
            handler: Arc::new(PersonHandler { profile, notices }),
        };
        let server = RpcServer::bind(bind, Arc::new(binder)).await?;
        let port = server.local_addr()?.port();
        let person = PersonRef::new(id, format!("{advertise_host}:{port}"));
        info!(%person, "person endpoint listening");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = server.spawn(shutdown_rx);
        Ok((
            Self {
                person,
                shutdown,
                task,
            },
            rx,
        ))
    }

    pub fn person(&self) -> &PersonRef {
        &self.person
    }

    /// Stops accepting calls and waits for the listener to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            debug!("person endpoint task ended abnormally: {e}");
        }
    }
}
