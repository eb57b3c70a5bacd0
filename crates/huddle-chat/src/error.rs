use huddle_protocol::{ErrorCode, NameError};

/// Requests the router refuses. None of them consumes a sequence number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// The body is empty after trimming.
    #[error("message is empty")]
    EmptyMessage,

    #[error("message is longer than {max} characters")]
    MessageTooLong { max: usize },

    #[error(transparent)]
    InvalidName(#[from] NameError),

    /// Another connection is registered under this name.
    #[error("display name '{0}' is already taken")]
    NameTaken(String),

    /// A chat command was malformed.
    #[error("{0}")]
    Usage(String),
}

impl RouterError {
    /// Wire error code reported back to the submitting connection.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyMessage | Self::MessageTooLong { .. } => ErrorCode::InvalidMessage,
            Self::InvalidName(_) => ErrorCode::InvalidName,
            Self::NameTaken(_) => ErrorCode::NameTaken,
            Self::Usage(_) => ErrorCode::Usage,
        }
    }
}
