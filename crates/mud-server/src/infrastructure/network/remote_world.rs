//! Cross-server link resolution over RPC.
//!
//! Opening a link is two calls: connect to `mud.<world>` on the target host,
//! then `ResolvePlace`.  A refused connection, an unknown world, or a timeout
//! is [`LinkError::Unreachable`]; a domain error from the remote world (such
//! as `NoSuchPlace`) is [`LinkError::Refused`].

use async_trait::async_trait;
use mud_core::{PersonRef, PlaceAddress};
use mud_rpc::{PlaceStub, RpcError, RpcOptions, WorldStub};
use tracing::debug;

use crate::application::link::{LinkError, RemotePlace, WorldLink};

fn link_error(e: RpcError) -> LinkError {
    match e {
        RpcError::Remote(domain) => LinkError::Refused(domain),
        other => LinkError::Unreachable(other.to_string()),
    }
}

pub struct RpcWorldLink {
    peer_name: String,
    options: RpcOptions,
}

impl RpcWorldLink {
    pub fn new(peer_name: &str, options: RpcOptions) -> Self {
        Self {
            peer_name: peer_name.to_string(),
            options,
        }
    }
}

#[async_trait]
impl WorldLink for RpcWorldLink {
    async fn open(&self, target: &PlaceAddress) -> Result<Box<dyn RemotePlace>, LinkError> {
        debug!(%target, "resolving remote place");
        let world = WorldStub::connect(&target.host, &target.world, &self.peer_name, self.options)
            .await
            .map_err(link_error)?;
        let address = world.resolve_place(&target.place).await.map_err(link_error)?;
        Ok(Box::new(RpcRemotePlace {
            stub: world.place(&address.place),
            address,
        }))
    }
}

/// A place on another server, reached through its own connection.
pub struct RpcRemotePlace {
    stub: PlaceStub,
    address: PlaceAddress,
}

#[async_trait]
impl RemotePlace for RpcRemotePlace {
    fn address(&self) -> PlaceAddress {
        self.address.clone()
    }

    async fn join(
        &self,
        person: &PersonRef,
        display_name: &str,
        greeting: Option<String>,
    ) -> Result<(), LinkError> {
        self.stub
            .join(person, display_name, greeting.as_deref())
            .await
            .map_err(link_error)
    }
}
