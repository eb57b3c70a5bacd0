//! Unified error type for the Huddle workspace.

use std::time::Duration;

use huddle_chat::RouterError;
use huddle_gate::GateError;
use huddle_protocol::{ConnectionId, ErrorCode, ProtocolError};
use huddle_services::{AuthError, DirectoryError, ProfileError, RelayError};
use huddle_session::SessionError;
use huddle_transport::TransportError;

/// Top-level error wrapping every crate-specific error.
///
/// Users of the `huddle` meta-crate match on this one type; `?` converts
/// sub-crate errors through the generated `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Room(#[from] RoomError),

    /// A peer did not finish the WebSocket upgrade in time.
    #[error("connection did not complete the handshake within {0:?}")]
    HandshakeTimeout(Duration),

    /// A connection did not register in time.
    #[error("connection did not register within {0:?}")]
    RegistrationTimeout(Duration),

    /// Bad host configuration, e.g. an unparsable environment variable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Requests the room actor refuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The connection has not completed `Register`.
    #[error("connection {0} is not registered")]
    NotRegistered(ConnectionId),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Gate(#[from] GateError),

    /// The room actor has stopped.
    #[error("room is no longer running")]
    Unavailable,
}

impl RoomError {
    /// Wire code for errors reported back to a client. `None` for
    /// failures the client cannot act on.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::NotRegistered(_) => Some(ErrorCode::NotRegistered),
            Self::Router(e) => Some(e.code()),
            Self::Gate(GateError::UnknownActuator(_)) => Some(ErrorCode::UnknownActuator),
            Self::Unavailable => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_protocol::{ActuatorId, RoomId};

    #[test]
    fn test_from_transport_error() {
        let err: HuddleError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, HuddleError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: HuddleError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, HuddleError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: HuddleError = SessionError::NotReady(RoomId::new("abc")).into();
        assert!(matches!(err, HuddleError::Session(_)));
    }

    #[test]
    fn test_from_directory_error() {
        let err: HuddleError = DirectoryError::RoomNotFound(RoomId::new("abc")).into();
        assert!(matches!(err, HuddleError::Directory(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err: HuddleError = RoomError::Unavailable.into();
        assert!(matches!(err, HuddleError::Room(RoomError::Unavailable)));
    }

    #[test]
    fn test_room_error_code_maps_router_and_gate() {
        assert_eq!(
            RoomError::Router(RouterError::EmptyMessage).code(),
            Some(ErrorCode::InvalidMessage)
        );
        assert_eq!(
            RoomError::Gate(GateError::UnknownActuator(ActuatorId::new("C"))).code(),
            Some(ErrorCode::UnknownActuator)
        );
        assert_eq!(
            RoomError::NotRegistered(ConnectionId::new(3)).code(),
            Some(ErrorCode::NotRegistered)
        );
        assert_eq!(RoomError::Unavailable.code(), None);
    }
}
