//! Pooled connections to world servers.

use std::collections::HashMap;

use async_trait::async_trait;
use mud_core::PersonRef;
use mud_rpc::{PersonStub, RpcError, RpcOptions, WorldStub};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::session::Gateway;

/// Keeps one open [`WorldStub`] per `(host, world)`.
///
/// A stub whose connection has closed is replaced on next use, so a world
/// server that restarts is picked up again without restarting the client.
pub struct ServerPool {
    peer_name: String,
    options: RpcOptions,
    worlds: Mutex<HashMap<(String, String), WorldStub>>,
}

impl ServerPool {
    /// `peer_name` is what this client calls itself in each handshake.
    pub fn new(peer_name: &str, options: RpcOptions) -> Self {
        Self {
            peer_name: peer_name.to_string(),
            options,
            worlds: Mutex::new(HashMap::new()),
        }
    }

    /// Number of open world connections.
    pub async fn len(&self) -> usize {
        self.worlds
            .lock()
            .await
            .values()
            .filter(|w| !w.is_closed())
            .count()
    }
}

#[async_trait]
impl Gateway for ServerPool {
    async fn world(&self, host: &str, world: &str) -> Result<WorldStub, RpcError> {
        let key = (host.to_string(), world.to_string());
        let mut worlds = self.worlds.lock().await;
        if let Some(stub) = worlds.get(&key) {
            if !stub.is_closed() {
                return Ok(stub.clone());
            }
            debug!(host, world, "world connection closed; reconnecting");
        }
        let stub = WorldStub::connect(host, world, &self.peer_name, self.options).await?;
        worlds.insert(key, stub.clone());
        Ok(stub)
    }

    async fn person(&self, person: &PersonRef) -> Result<PersonStub, RpcError> {
        PersonStub::connect(person, &self.peer_name, self.options).await
    }
}
