//! Error types for the session coordinator.

use std::time::Duration;

use huddle_protocol::RoomId;
use huddle_services::{AuthError, DirectoryError, RelayError};

/// Everything a coordinator operation can fail with.
///
/// The coordinator never retries on its own. Callers decide, guided by
/// [`is_retryable`](Self::is_retryable).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Directory(DirectoryError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    /// The room exists but its owner has not published a relay join code
    /// yet. Try again shortly.
    #[error("room {0} is not ready to join yet")]
    NotReady(RoomId),

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The operation does not fit the coordinator's current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Rejected before any service call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl SessionError {
    /// Whether repeating the operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotReady(_) | Self::Timeout(_) => true,
            Self::Directory(e) => e.is_retryable(),
            Self::Relay(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<DirectoryError> for SessionError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::RoomNotFound(id) => Self::RoomNotFound(id),
            DirectoryError::InvalidRequest(reason) => Self::InvalidInput(reason),
            other => Self::Directory(other),
        }
    }
}

/// Why a heartbeat loop ended. Not an error: both are normal exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeartbeatExit {
    /// Stopped by `stop_heartbeat`, `leave`, `shutdown` or drop.
    Cancelled,
    /// The directory no longer knows the room.
    RoomClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_not_found_maps_to_room_not_found() {
        let err: SessionError = DirectoryError::RoomNotFound(RoomId::new("r")).into();
        assert!(matches!(err, SessionError::RoomNotFound(_)));
    }

    #[test]
    fn test_directory_invalid_request_maps_to_invalid_input() {
        let err: SessionError = DirectoryError::InvalidRequest("empty".into()).into();
        assert!(matches!(err, SessionError::InvalidInput(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(SessionError::NotReady(RoomId::new("r")).is_retryable());
        assert!(SessionError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(SessionError::from(DirectoryError::Unavailable("x".into())).is_retryable());
        assert!(SessionError::from(RelayError::Unavailable("x".into())).is_retryable());
        assert!(!SessionError::from(RelayError::InvalidJoinCode("x".into())).is_retryable());
        assert!(!SessionError::InvalidState("closed".into()).is_retryable());
    }
}
