//! Person handles backed by an RPC connection to the player's endpoint.
//!
//! The connection is opened on the first `tell`, not when the person joins,
//! and reopened if it has closed since.  Failing to connect is reported as a
//! delivery failure like any other, which is what drops a vanished player
//! from the place they were in.

use std::sync::Arc;

use async_trait::async_trait;
use mud_core::PersonRef;
use mud_rpc::{PersonStub, RpcError, RpcOptions};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::person::{DeliveryError, PersonConnector, PersonHandle};

pub struct RemotePerson {
    person: PersonRef,
    peer_name: String,
    options: RpcOptions,
    // Held across a delivery, so lines reach the player in order.
    stub: Mutex<Option<PersonStub>>,
}

impl RemotePerson {
    pub fn new(person: PersonRef, peer_name: &str, options: RpcOptions) -> Self {
        Self {
            person,
            peer_name: peer_name.to_string(),
            options,
            stub: Mutex::new(None),
        }
    }

    fn unreachable(&self, e: RpcError) -> DeliveryError {
        DeliveryError::Unreachable {
            person: self.person.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl PersonHandle for RemotePerson {
    fn person(&self) -> &PersonRef {
        &self.person
    }

    async fn tell(&self, text: &str) -> Result<(), DeliveryError> {
        let mut slot = self.stub.lock().await;
        let stub = match slot.take() {
            Some(stub) if !stub.is_closed() => stub,
            _ => {
                debug!(person = %self.person, "opening person endpoint");
                PersonStub::connect(&self.person, &self.peer_name, self.options)
                    .await
                    .map_err(|e| self.unreachable(e))?
            }
        };
        let result = stub.tell(text).await;
        *slot = Some(stub);
        result.map_err(|e| self.unreachable(e))
    }
}

/// Hands out [`RemotePerson`]s.
pub struct RpcPersonConnector {
    peer_name: String,
    options: RpcOptions,
}

impl RpcPersonConnector {
    /// `peer_name` identifies this server in the handshake with each player.
    pub fn new(peer_name: &str, options: RpcOptions) -> Self {
        Self {
            peer_name: peer_name.to_string(),
            options,
        }
    }
}

impl PersonConnector for RpcPersonConnector {
    fn connect(&self, person: &PersonRef) -> Arc<dyn PersonHandle> {
        Arc::new(RemotePerson::new(person.clone(), &self.peer_name, self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_tell_to_dead_endpoint_is_unreachable() {
        // Arrange: a port with nothing listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        drop(listener);
        let options = RpcOptions {
            connect_timeout: Duration::from_millis(200),
            ..RpcOptions::default()
        };
        let connector = RpcPersonConnector::new("test", options);
        let handle = connector.connect(&PersonRef::new(Uuid::new_v4(), endpoint));

        // Act
        let result = handle.tell("hello").await;

        // Assert
        assert!(matches!(result, Err(DeliveryError::Unreachable { .. })));
    }
}
