//! Error types for the protocol layer.

/// Errors raised while encoding, decoding or validating protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a value into bytes failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not a valid message (malformed JSON, unknown `type`,
    /// missing fields).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A relay join code failed validation.
    #[error("invalid join code: {0}")]
    InvalidJoinCode(String),

    /// Decoded fine but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
