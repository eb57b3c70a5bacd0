//! Messages exchanged between participants and the room host.
//!
//! Both directions use internally tagged JSON (`{"type": "Say", ...}`), so
//! a message can be read in a WebSocket inspector without a decoder.

use serde::{Deserialize, Serialize};

use crate::{ActuatorId, ChatEvent, ConnectionId, ParticipantId};

// ---------------------------------------------------------------------------
// Client -> host
// ---------------------------------------------------------------------------

/// Sent by a participant's client to the room host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Must be the first message on a connection.
    ///
    /// With no `display_name`, the host looks the name up in the profile
    /// store by `identity` and falls back to a synthetic one.
    Register {
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        identity: Option<ParticipantId>,
    },

    /// Free text as typed. `/msg <nick> <message>` becomes a directed line.
    Say { text: String },

    /// Public line.
    Broadcast { body: String },

    /// Private line to the participant registered as `target`.
    Directed { target: String, body: String },

    /// Press one switch of the room's coordinated gate.
    Actuate { actuator: ActuatorId },

    /// Graceful disconnect.
    Bye,
}

// ---------------------------------------------------------------------------
// Host -> client
// ---------------------------------------------------------------------------

/// Sent by the room host to one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to `Register`. `gate_open` lets late joiners see a gate that
    /// opened before they arrived.
    Welcome {
        connection: ConnectionId,
        gate_open: bool,
    },

    /// A sequenced chat line.
    Chat { event: ChatEvent },

    /// The room's gate latched open. Sent once per connection.
    GateOpened,

    /// A request from this connection was rejected. Nothing was sequenced.
    Error { code: ErrorCode, message: String },
}

/// Machine-readable reason carried by [`ServerMessage::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The payload could not be decoded.
    BadMessage,
    /// A chat or gate request arrived before `Register`.
    NotRegistered,
    /// A second `Register` on a connection that already has a name.
    AlreadyRegistered,
    /// The display name is malformed.
    InvalidName,
    /// The display name belongs to another connection.
    NameTaken,
    /// Empty or oversized message body.
    InvalidMessage,
    /// Malformed chat command, e.g. `/msg` without a body.
    Usage,
    /// The gate does not know this actuator.
    UnknownActuator,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_register_is_internally_tagged() {
        let msg = ClientMessage::Register {
            display_name: Some("Nick1".into()),
            identity: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Register");
        assert_eq!(json["display_name"], "Nick1");
    }

    #[test]
    fn test_client_register_fields_default_to_none() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"Register"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Register {
                display_name: None,
                identity: None
            }
        );
    }

    #[test]
    fn test_client_unit_variant_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"Bye"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Bye);
    }

    #[test]
    fn test_client_unknown_type_is_rejected() {
        let res: Result<ClientMessage, _> = serde_json::from_str(r#"{"type":"Fly"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_server_error_code_is_snake_case() {
        let msg = ServerMessage::Error {
            code: ErrorCode::NameTaken,
            message: "taken".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], "name_taken");
    }

    #[test]
    fn test_server_welcome_carries_connection_as_number() {
        let msg = ServerMessage::Welcome {
            connection: ConnectionId::new(7),
            gate_open: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"Welcome","connection":7,"gate_open":true}"#);
    }
}
