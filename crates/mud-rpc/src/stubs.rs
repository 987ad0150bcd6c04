//! Typed client-side stubs for worlds, places, and persons.
//!
//! Each stub method builds one [`Request`], sends it over an [`RpcClient`],
//! and checks that the [`Response`] has the expected shape.  A place stub is
//! nothing more than a shared connection plus the place's address, so
//! creating one costs nothing.

use std::sync::Arc;

use mud_core::protocol::messages::{PersonCall, PlaceCall, Request, Response};
use mud_core::{world_binding, PersonRef, PlaceAddress};

use crate::client::{RpcClient, RpcOptions};
use crate::error::RpcError;

// ── Response shape helpers ────────────────────────────────────────────────────

fn expect_unit(label: &'static str, response: Response) -> Result<(), RpcError> {
    match response {
        Response::Unit => Ok(()),
        _ => Err(RpcError::UnexpectedReply(label)),
    }
}

fn expect_text(label: &'static str, response: Response) -> Result<String, RpcError> {
    match response {
        Response::Text(text) => Ok(text),
        _ => Err(RpcError::UnexpectedReply(label)),
    }
}

fn expect_names(label: &'static str, response: Response) -> Result<Vec<String>, RpcError> {
    match response {
        Response::Names(names) => Ok(names),
        _ => Err(RpcError::UnexpectedReply(label)),
    }
}

fn expect_place(label: &'static str, response: Response) -> Result<PlaceAddress, RpcError> {
    match response {
        Response::Place(address) => Ok(address),
        _ => Err(RpcError::UnexpectedReply(label)),
    }
}

fn expect_person(label: &'static str, response: Response) -> Result<PersonRef, RpcError> {
    match response {
        Response::Person(person) => Ok(person),
        _ => Err(RpcError::UnexpectedReply(label)),
    }
}

// ── World ─────────────────────────────────────────────────────────────────────

/// Handle on a world server (`mud.<world>` on `host`).
#[derive(Debug, Clone)]
pub struct WorldStub {
    client: Arc<RpcClient>,
    host: String,
    world: String,
}

impl WorldStub {
    /// Looks up `world` on `host` and binds a connection to it.
    ///
    /// # Errors
    ///
    /// [`RpcError::Connect`] if the host is unreachable,
    /// [`RpcError::Rejected`] if it serves no such world.
    pub async fn connect(
        host: &str,
        world: &str,
        peer_name: &str,
        options: RpcOptions,
    ) -> Result<Self, RpcError> {
        let client = RpcClient::connect(host, &world_binding(world), peer_name, options).await?;
        Ok(Self::from_client(Arc::new(client), host, world))
    }

    pub fn from_client(client: Arc<RpcClient>, host: &str, world: &str) -> Self {
        Self {
            client,
            host: host.to_string(),
            world: world.to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    /// `true` once the underlying connection has failed or been closed.
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    pub async fn entrance(&self) -> Result<PlaceAddress, RpcError> {
        let response = self.client.call(Request::Entrance).await?;
        expect_place("entrance", response)
    }

    pub async fn resolve_place(&self, name: &str) -> Result<PlaceAddress, RpcError> {
        let response = self
            .client
            .call(Request::ResolvePlace {
                name: name.to_string(),
            })
            .await?;
        expect_place("resolve_place", response)
    }

    pub async fn world_name(&self) -> Result<String, RpcError> {
        let response = self.client.call(Request::WorldName).await?;
        expect_text("world_name", response)
    }

    /// Asks the server to write a snapshot to `path` on the server's host.
    pub async fn dump(&self, password: &str, path: &str) -> Result<(), RpcError> {
        let response = self
            .client
            .call(Request::Dump {
                password: password.to_string(),
                path: path.to_string(),
            })
            .await?;
        expect_unit("dump", response)
    }

    /// A stub for the place called `name` in this world.  No network traffic.
    pub fn place(&self, name: &str) -> PlaceStub {
        PlaceStub {
            client: Arc::clone(&self.client),
            address: PlaceAddress::new(self.host.clone(), self.world.clone(), name),
        }
    }
}

// ── Place ─────────────────────────────────────────────────────────────────────

/// Handle on one place, sharing its world's connection.
#[derive(Debug, Clone)]
pub struct PlaceStub {
    client: Arc<RpcClient>,
    address: PlaceAddress,
}

impl PlaceStub {
    pub fn address(&self) -> &PlaceAddress {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.address.place
    }

    async fn call(&self, call: PlaceCall) -> Result<Response, RpcError> {
        self.client
            .call(Request::Place {
                place: self.address.place.clone(),
                call,
            })
            .await
    }

    pub async fn describe(&self) -> Result<String, RpcError> {
        expect_text("describe", self.call(PlaceCall::Describe).await?)
    }

    pub async fn list_items(&self) -> Result<Vec<String>, RpcError> {
        expect_names("list_items", self.call(PlaceCall::ListItems).await?)
    }

    pub async fn list_occupants(&self) -> Result<Vec<String>, RpcError> {
        expect_names("list_occupants", self.call(PlaceCall::ListOccupants).await?)
    }

    pub async fn list_exits(&self) -> Result<Vec<String>, RpcError> {
        expect_names("list_exits", self.call(PlaceCall::ListExits).await?)
    }

    pub async fn lookup_occupant(&self, name: &str) -> Result<PersonRef, RpcError> {
        let call = PlaceCall::LookupOccupant {
            name: name.to_string(),
        };
        expect_person("lookup_occupant", self.call(call).await?)
    }

    pub async fn inspect_item(&self, name: &str) -> Result<String, RpcError> {
        let call = PlaceCall::InspectItem {
            name: name.to_string(),
        };
        expect_text("inspect_item", self.call(call).await?)
    }

    /// Moves `person` through `exit`; returns where they ended up.
    pub async fn go(&self, person: &PersonRef, exit: &str) -> Result<PlaceAddress, RpcError> {
        let call = PlaceCall::Go {
            person: person.clone(),
            exit: exit.to_string(),
        };
        expect_place("go", self.call(call).await?)
    }

    pub async fn say(&self, person: &PersonRef, text: &str) -> Result<(), RpcError> {
        let call = PlaceCall::Say {
            person: person.clone(),
            text: text.to_string(),
        };
        expect_unit("say", self.call(call).await?)
    }

    pub async fn act(&self, person: &PersonRef, text: &str) -> Result<(), RpcError> {
        let call = PlaceCall::Act {
            person: person.clone(),
            text: text.to_string(),
        };
        expect_unit("act", self.call(call).await?)
    }

    pub async fn create_item(
        &self,
        person: &PersonRef,
        name: &str,
        description: &str,
    ) -> Result<(), RpcError> {
        let call = PlaceCall::CreateItem {
            person: person.clone(),
            name: name.to_string(),
            description: description.to_string(),
        };
        expect_unit("create_item", self.call(call).await?)
    }

    pub async fn destroy_item(&self, person: &PersonRef, name: &str) -> Result<(), RpcError> {
        let call = PlaceCall::DestroyItem {
            person: person.clone(),
            name: name.to_string(),
        };
        expect_unit("destroy_item", self.call(call).await?)
    }

    pub async fn create_exit(
        &self,
        person: &PersonRef,
        exit: &str,
        return_exit: &str,
        place: &str,
        description: &str,
    ) -> Result<(), RpcError> {
        let call = PlaceCall::CreateExit {
            person: person.clone(),
            exit: exit.to_string(),
            return_exit: return_exit.to_string(),
            place: place.to_string(),
            description: description.to_string(),
        };
        expect_unit("create_exit", self.call(call).await?)
    }

    pub async fn link_exit(
        &self,
        person: &PersonRef,
        exit: &str,
        target: PlaceAddress,
    ) -> Result<(), RpcError> {
        let call = PlaceCall::LinkExit {
            person: person.clone(),
            exit: exit.to_string(),
            target,
        };
        expect_unit("link_exit", self.call(call).await?)
    }

    pub async fn close_exit(&self, person: &PersonRef, exit: &str) -> Result<(), RpcError> {
        let call = PlaceCall::CloseExit {
            person: person.clone(),
            exit: exit.to_string(),
        };
        expect_unit("close_exit", self.call(call).await?)
    }

    pub async fn leave(&self, person: &PersonRef, farewell: Option<&str>) -> Result<(), RpcError> {
        let call = PlaceCall::Leave {
            person: person.clone(),
            farewell: farewell.map(str::to_string),
        };
        expect_unit("leave", self.call(call).await?)
    }

    pub async fn join(
        &self,
        person: &PersonRef,
        display_name: &str,
        greeting: Option<&str>,
    ) -> Result<(), RpcError> {
        let call = PlaceCall::Join {
            person: person.clone(),
            display_name: display_name.to_string(),
            greeting: greeting.map(str::to_string),
        };
        expect_unit("join", self.call(call).await?)
    }
}

// ── Person ────────────────────────────────────────────────────────────────────

/// Handle on a person endpoint (`person.<uuid>` on the player's machine).
#[derive(Debug)]
pub struct PersonStub {
    client: RpcClient,
    person: PersonRef,
}

impl PersonStub {
    /// # Errors
    ///
    /// Any transport error means the person is unreachable.
    pub async fn connect(
        person: &PersonRef,
        peer_name: &str,
        options: RpcOptions,
    ) -> Result<Self, RpcError> {
        let client =
            RpcClient::connect(&person.endpoint, &person.binding(), peer_name, options).await?;
        Ok(Self {
            client,
            person: person.clone(),
        })
    }

    pub fn person(&self) -> &PersonRef {
        &self.person
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    pub async fn name(&self) -> Result<String, RpcError> {
        let response = self.client.call(Request::Person(PersonCall::Name)).await?;
        expect_text("person_name", response)
    }

    pub async fn description(&self) -> Result<String, RpcError> {
        let response = self
            .client
            .call(Request::Person(PersonCall::Description))
            .await?;
        expect_text("person_description", response)
    }

    /// Delivers one line to the player.
    pub async fn tell(&self, text: &str) -> Result<(), RpcError> {
        let response = self
            .client
            .call(Request::Person(PersonCall::Tell {
                text: text.to_string(),
            }))
            .await?;
        expect_unit("person_tell", response)
    }
}
