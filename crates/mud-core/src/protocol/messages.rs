//! All MUD protocol message types.
//!
//! A connection carries two kinds of traffic:
//!
//! - **Session control** (`Hello`, `HelloAck`, `Ping`, `Pong`, `Disconnect`)
//!   establishes which remote object the connection is bound to and keeps it
//!   alive.
//! - **Invocations** (`Call`, `Reply`) carry one remote method call and its
//!   outcome.  The request vocabulary below mirrors the world, place, and
//!   person operations one-to-one.

use serde::{Deserialize, Serialize};

use crate::domain::address::{PersonRef, PlaceAddress};
use crate::domain::error::MudError;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Total size of the common message header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Largest payload a peer will accept in one frame.
pub const MAX_PAYLOAD_LEN: usize = 1 << 20;

// ── Message type codes ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Session control (0x00–0x1F)
    Hello = 0x01,
    HelloAck = 0x02,
    Ping = 0x07,
    Pong = 0x08,
    Disconnect = 0x09,
    // Invocation (0x20–0x3F)
    Call = 0x20,
    Reply = 0x21,
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(MessageType::Hello),
            0x02 => Ok(MessageType::HelloAck),
            0x07 => Ok(MessageType::Ping),
            0x08 => Ok(MessageType::Pong),
            0x09 => Ok(MessageType::Disconnect),
            0x20 => Ok(MessageType::Call),
            0x21 => Ok(MessageType::Reply),
            _ => Err(()),
        }
    }
}

// ── Session control payloads ──────────────────────────────────────────────────

/// HELLO (0x01): first message on every connection, sent by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    /// Protocol version the caller speaks.
    pub protocol_version: u8,
    /// Binding name of the object the caller wants to talk to
    /// (`mud.<world>` or `person.<uuid>`).
    pub binding: String,
    /// Free-form label for logs (a player name, or a server's world name).
    pub peer_name: String,
}

/// Why a HELLO was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RejectReason {
    None = 0x00,
    /// Nothing is bound under the requested name on this host.
    UnknownBinding = 0x01,
    VersionMismatch = 0x02,
}

/// HELLO_ACK (0x02): listener response to a HELLO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloAckMessage {
    pub accepted: bool,
    /// [`RejectReason::None`] when accepted.
    pub reject_reason: RejectReason,
}

impl HelloAckMessage {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reject_reason: RejectReason::None,
        }
    }

    pub fn reject(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reject_reason: reason,
        }
    }
}

/// Reason code carried by DISCONNECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DisconnectReason {
    /// The peer is shutting down in an orderly way.
    Shutdown = 0x01,
    /// The peer received something it could not decode.
    ProtocolError = 0x02,
    /// The caller is done with the binding.
    Goodbye = 0x03,
}

impl TryFrom<u8> for DisconnectReason {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(DisconnectReason::Shutdown),
            0x02 => Ok(DisconnectReason::ProtocolError),
            0x03 => Ok(DisconnectReason::Goodbye),
            _ => Err(()),
        }
    }
}

// ── Invocation payloads ───────────────────────────────────────────────────────

/// Operations on a single place.
///
/// Read-only operations need no caller identity.  Every other operation names
/// the acting person explicitly, exactly as a caller would pass its own
/// person object to a remote method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceCall {
    Describe,
    ListItems,
    ListOccupants,
    ListExits,
    LookupOccupant {
        name: String,
    },
    InspectItem {
        name: String,
    },
    Go {
        person: PersonRef,
        exit: String,
    },
    Say {
        person: PersonRef,
        text: String,
    },
    Act {
        person: PersonRef,
        text: String,
    },
    CreateItem {
        person: PersonRef,
        name: String,
        description: String,
    },
    DestroyItem {
        person: PersonRef,
        name: String,
    },
    CreateExit {
        person: PersonRef,
        exit: String,
        return_exit: String,
        place: String,
        description: String,
    },
    LinkExit {
        person: PersonRef,
        exit: String,
        target: PlaceAddress,
    },
    CloseExit {
        person: PersonRef,
        exit: String,
    },
    Leave {
        person: PersonRef,
        farewell: Option<String>,
    },
    Join {
        person: PersonRef,
        display_name: String,
        greeting: Option<String>,
    },
}

/// Operations on a person endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonCall {
    Name,
    Description,
    /// Delivers one line of text to the player.
    Tell { text: String },
}

/// Every remote method the protocol knows about.
///
/// Which variants are meaningful depends on the binding: a world server
/// answers the world-level variants and `Place`, a person endpoint answers
/// `Person`.  Anything else is refused with [`MudError::BadRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// The world's bootstrap place.
    Entrance,
    ResolvePlace {
        name: String,
    },
    WorldName,
    /// Writes a snapshot of the world to a file on the server host.
    Dump {
        password: String,
        path: String,
    },
    Place {
        place: String,
        call: PlaceCall,
    },
    Person(PersonCall),
}

impl Request {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Request::Entrance => "entrance",
            Request::ResolvePlace { .. } => "resolve_place",
            Request::WorldName => "world_name",
            Request::Dump { .. } => "dump",
            Request::Place { call, .. } => match call {
                PlaceCall::Describe => "describe",
                PlaceCall::ListItems => "list_items",
                PlaceCall::ListOccupants => "list_occupants",
                PlaceCall::ListExits => "list_exits",
                PlaceCall::LookupOccupant { .. } => "lookup_occupant",
                PlaceCall::InspectItem { .. } => "inspect_item",
                PlaceCall::Go { .. } => "go",
                PlaceCall::Say { .. } => "say",
                PlaceCall::Act { .. } => "act",
                PlaceCall::CreateItem { .. } => "create_item",
                PlaceCall::DestroyItem { .. } => "destroy_item",
                PlaceCall::CreateExit { .. } => "create_exit",
                PlaceCall::LinkExit { .. } => "link_exit",
                PlaceCall::CloseExit { .. } => "close_exit",
                PlaceCall::Leave { .. } => "leave",
                PlaceCall::Join { .. } => "join",
            },
            Request::Person(PersonCall::Name) => "person_name",
            Request::Person(PersonCall::Description) => "person_description",
            Request::Person(PersonCall::Tell { .. }) => "person_tell",
        }
    }
}

/// Successful results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Unit,
    Text(String),
    Names(Vec<String>),
    Place(PlaceAddress),
    Person(PersonRef),
}

/// CALL (0x20): one remote method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMessage {
    /// Correlates the reply; unique per connection.
    pub call_id: u64,
    pub request: Request,
}

/// REPLY (0x21): the outcome of the call with the same `call_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub call_id: u64,
    pub outcome: Result<Response, MudError>,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// Any message that can travel over a MUD connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MudMessage {
    Hello(HelloMessage),
    HelloAck(HelloAckMessage),
    /// Keep-alive probe carrying an opaque token.
    Ping(u64),
    /// Answer to a `Ping`, echoing its token.
    Pong(u64),
    Disconnect { reason: DisconnectReason },
    Call(CallMessage),
    Reply(ReplyMessage),
}

impl MudMessage {
    /// Returns the [`MessageType`] discriminant for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            MudMessage::Hello(_) => MessageType::Hello,
            MudMessage::HelloAck(_) => MessageType::HelloAck,
            MudMessage::Ping(_) => MessageType::Ping,
            MudMessage::Pong(_) => MessageType::Pong,
            MudMessage::Disconnect { .. } => MessageType::Disconnect,
            MudMessage::Call(_) => MessageType::Call,
            MudMessage::Reply(_) => MessageType::Reply,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
