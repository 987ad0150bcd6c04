//! Binary codec for encoding and decoding MUD protocol messages.
//!
//! Wire format:
//! ```text
//! [version:1][msg_type:1][reserved:2][payload_len:4][seq:8][timestamp_us:8][payload:N]
//! ```
//! Total header size: 24 bytes. All multi-byte integers are big-endian.
//!
//! `Ping`, `Pong`, and `Disconnect` have fixed hand-written payloads.  The
//! structured payloads (`Hello`, `HelloAck`, `Call`, `Reply`) are `bincode`
//! encodings of the serde types in [`crate::protocol::messages`].

use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::protocol::messages::{
    DisconnectReason, MessageType, MudMessage, HEADER_SIZE, MAX_PAYLOAD_LEN, PROTOCOL_VERSION,
};

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice does not yet hold a complete frame.  Stream readers
    /// treat this as "read more bytes", not as a failure.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The message type byte in the header is not a recognized value.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// The protocol version in the header is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The payload could not be parsed.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The header declares a payload larger than [`MAX_PAYLOAD_LEN`].
    #[error("payload of {declared} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { declared: usize, max: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`MudMessage`] into a byte vector including the 24-byte header.
///
/// The sequence number is **not** set by this function – pass a pre-incremented
/// value from a [`crate::protocol::SequenceCounter`].
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] if a structured payload cannot
/// be serialized, or [`ProtocolError::PayloadTooLarge`] if it exceeds the
/// frame limit.
///
/// # Examples
///
/// ```rust
/// use mud_core::protocol::{encode_message, decode_message};
/// use mud_core::protocol::messages::MudMessage;
///
/// let msg = MudMessage::Ping(42);
/// let bytes = encode_message(&msg, 0, 0).unwrap();
/// let (decoded, consumed) = decode_message(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_message(
    msg: &MudMessage,
    sequence_number: u64,
    timestamp_us: u64,
) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_payload(msg)?;
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            declared: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }
    let payload_len = payload.len() as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());

    // Header: version (1) + msg_type (1) + reserved (2) + payload_len (4) +
    //         seq (8) + timestamp_us (8) = 24 bytes
    buf.push(PROTOCOL_VERSION);
    buf.push(msg.message_type() as u8);
    buf.push(0x00); // reserved
    buf.push(0x00); // reserved
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(&sequence_number.to_be_bytes());
    buf.extend_from_slice(&timestamp_us.to_be_bytes());

    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Encodes a [`MudMessage`] using the current system time as the timestamp.
///
/// # Errors
///
/// Same as [`encode_message`].
pub fn encode_message_now(
    msg: &MudMessage,
    sequence_number: u64,
) -> Result<Vec<u8>, ProtocolError> {
    encode_message(msg, sequence_number, current_timestamp_us())
}

/// Microseconds since the Unix epoch, or 0 if the clock is before it.
pub fn current_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Decodes one [`MudMessage`] from the beginning of `bytes`.
///
/// Returns the decoded message and the total number of bytes consumed
/// (header + payload), so the caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] while the frame is incomplete,
/// and the other variants if the bytes are malformed.
pub fn decode_message(bytes: &[u8]) -> Result<(MudMessage, usize), ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let msg_type_byte = bytes[1];
    let msg_type = MessageType::try_from(msg_type_byte)
        .map_err(|_| ProtocolError::UnknownMessageType(msg_type_byte))?;

    // bytes[2..4] are reserved – ignored on decode

    let payload_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            declared: payload_len,
            max: MAX_PAYLOAD_LEN,
        });
    }

    let total_needed = HEADER_SIZE + payload_len;
    if bytes.len() < total_needed {
        return Err(ProtocolError::InsufficientData {
            needed: total_needed,
            available: bytes.len(),
        });
    }

    let payload = &bytes[HEADER_SIZE..total_needed];
    let msg = decode_payload(msg_type, payload)?;
    Ok((msg, total_needed))
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_payload(msg: &MudMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    match msg {
        MudMessage::Hello(m) => buf = to_bincode(m)?,
        MudMessage::HelloAck(m) => buf = to_bincode(m)?,
        MudMessage::Ping(token) => buf.extend_from_slice(&token.to_be_bytes()),
        MudMessage::Pong(token) => buf.extend_from_slice(&token.to_be_bytes()),
        MudMessage::Disconnect { reason } => buf.push(*reason as u8),
        MudMessage::Call(m) => buf = to_bincode(m)?,
        MudMessage::Reply(m) => buf = to_bincode(m)?,
    }
    Ok(buf)
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_payload(msg_type: MessageType, payload: &[u8]) -> Result<MudMessage, ProtocolError> {
    match msg_type {
        MessageType::Hello => from_bincode(payload, "Hello").map(MudMessage::Hello),
        MessageType::HelloAck => from_bincode(payload, "HelloAck").map(MudMessage::HelloAck),
        MessageType::Ping => read_u64(payload, "Ping").map(MudMessage::Ping),
        MessageType::Pong => read_u64(payload, "Pong").map(MudMessage::Pong),
        MessageType::Disconnect => {
            require_len(payload, 1, "Disconnect")?;
            let reason = DisconnectReason::try_from(payload[0]).map_err(|_| {
                let reason = payload[0];
                ProtocolError::MalformedPayload(format!("unknown disconnect reason: {reason}"))
            })?;
            Ok(MudMessage::Disconnect { reason })
        }
        MessageType::Call => from_bincode(payload, "Call").map(MudMessage::Call),
        MessageType::Reply => from_bincode(payload, "Reply").map(MudMessage::Reply),
    }
}

// ── Primitive helpers ─────────────────────────────────────────────────────────

fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(value).map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
}

fn from_bincode<T: DeserializeOwned>(payload: &[u8], context: &str) -> Result<T, ProtocolError> {
    bincode::deserialize(payload)
        .map_err(|e| ProtocolError::MalformedPayload(format!("{context}: {e}")))
}

fn require_len(p: &[u8], min: usize, context: &str) -> Result<(), ProtocolError> {
    if p.len() < min {
        return Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {min} bytes, got {}",
            p.len()
        )));
    }
    Ok(())
}

fn read_u64(p: &[u8], context: &str) -> Result<u64, ProtocolError> {
    require_len(p, 8, context)?;
    Ok(u64::from_be_bytes([p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7]]))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::MudError;
    use crate::protocol::messages::{ReplyMessage, Response};

    #[test]
    fn test_header_layout_is_big_endian() {
        // Arrange
        let msg = MudMessage::Ping(0x0102_0304_0506_0708);

        // Act
        let bytes = encode_message(&msg, 0xAA, 0xBB).unwrap();

        // Assert
        assert_eq!(bytes.len(), HEADER_SIZE + 8);
        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(bytes[1], MessageType::Ping as u8);
        assert_eq!(&bytes[2..4], &[0, 0]);
        assert_eq!(&bytes[4..8], &8u32.to_be_bytes());
        assert_eq!(&bytes[8..16], &0xAAu64.to_be_bytes());
        assert_eq!(&bytes[16..24], &0xBBu64.to_be_bytes());
        assert_eq!(&bytes[24..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_decode_short_header_needs_more_data() {
        let result = decode_message(&[PROTOCOL_VERSION, 0x07]);
        assert_eq!(
            result,
            Err(ProtocolError::InsufficientData {
                needed: HEADER_SIZE,
                available: 2
            })
        );
    }

    #[test]
    fn test_decode_partial_payload_needs_more_data() {
        // Arrange: full header, truncated payload
        let bytes = encode_message(&MudMessage::Pong(7), 0, 0).unwrap();

        // Act
        let result = decode_message(&bytes[..HEADER_SIZE + 3]);

        // Assert
        assert!(matches!(
            result,
            Err(ProtocolError::InsufficientData { needed, .. }) if needed == HEADER_SIZE + 8
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_version() {
        let mut bytes = encode_message(&MudMessage::Ping(1), 0, 0).unwrap();
        bytes[0] = 0x7F;
        assert_eq!(
            decode_message(&bytes),
            Err(ProtocolError::UnsupportedVersion(0x7F))
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let mut bytes = encode_message(&MudMessage::Ping(1), 0, 0).unwrap();
        bytes[1] = 0x55;
        assert_eq!(
            decode_message(&bytes),
            Err(ProtocolError::UnknownMessageType(0x55))
        );
    }

    #[test]
    fn test_decode_rejects_oversized_declared_payload() {
        // Arrange: a header that claims a 2 MiB payload
        let mut bytes = encode_message(&MudMessage::Ping(1), 0, 0).unwrap();
        let huge = (MAX_PAYLOAD_LEN as u32) + 1;
        bytes[4..8].copy_from_slice(&huge.to_be_bytes());

        // Act / Assert
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_disconnect_reason_is_malformed() {
        let mut bytes = encode_message(
            &MudMessage::Disconnect {
                reason: DisconnectReason::Shutdown,
            },
            0,
            0,
        )
        .unwrap();
        bytes[HEADER_SIZE] = 0xEE;
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_garbage_call_payload_is_malformed() {
        // Arrange: a CALL header followed by bytes that are not a CallMessage
        let mut bytes = vec![PROTOCOL_VERSION, MessageType::Call as u8, 0, 0];
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF]);

        // Act / Assert
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_reply_carrying_domain_error_decodes() {
        let msg = MudMessage::Reply(ReplyMessage {
            call_id: 9,
            outcome: Err(MudError::NoSuchExit("up".into())),
        });
        let bytes = encode_message(&msg, 1, 2).unwrap();
        let (decoded, _) = decode_message(&bytes).unwrap();
        assert_eq!(decoded, msg);

        let ok = MudMessage::Reply(ReplyMessage {
            call_id: 10,
            outcome: Ok(Response::Names(vec!["north".into(), "south".into()])),
        });
        let bytes = encode_message(&ok, 2, 3).unwrap();
        assert_eq!(decode_message(&bytes).unwrap().0, ok);
    }

    #[test]
    fn test_current_timestamp_us_is_positive() {
        assert!(current_timestamp_us() > 0);
    }
}
