//! Error types for the external service clients.
//!
//! One enum per collaborator, so a caller can tell a directory outage
//! from a relay outage without string matching.

use huddle_protocol::{JoinCode, NameError, ParticipantId, RoomId, TransportMode};

/// Failures of the identity session and its auth provider.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// An operation needs an identity but `sign_in` has not succeeded yet.
    #[error("not signed in")]
    NotSignedIn,

    /// The provider refused to issue an identity.
    #[error("sign-in rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached.
    #[error("auth provider unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    InvalidName(#[from] NameError),

    /// Loading or saving the profile-backed display name failed.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Failures reported by the room directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The room was deleted or expired.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// Every slot is taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The request failed local validation and was never sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service understood the request and refused it.
    #[error("directory rejected request: {0}")]
    Rejected(String),

    /// Network or service outage.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Failures reported by the relay allocator.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The code is malformed.
    #[error("invalid join code: {0}")]
    InvalidJoinCode(String),

    /// The code is well-formed but maps to no live allocation.
    #[error("unknown join code {0}")]
    UnknownJoinCode(JoinCode),

    #[error("unknown allocation {0}")]
    UnknownAllocation(String),

    /// The code was issued for a different transport mode.
    #[error("join code issued for {expected}, requested {requested}")]
    ModeMismatch {
        expected: TransportMode,
        requested: TransportMode,
    },

    #[error("relay rejected request: {0}")]
    Rejected(String),

    #[error("relay unavailable: {0}")]
    Unavailable(String),
}

impl RelayError {
    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Failures reported by the profile store.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// No profile has been saved for this participant.
    #[error("no profile for {0}")]
    NotFound(ParticipantId),

    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}
