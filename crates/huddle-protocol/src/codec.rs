//! Byte encoding for wire messages.
//!
//! The room host and its clients only ever see [`Codec`]; which format sits
//! behind it is a deployment choice. [`JsonCodec`] is the one shipped.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts protocol values to and from bytes.
///
/// `Send + Sync + 'static` so one codec value can be shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes `value`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one value from `data`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] on malformed or mistyped input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON codec backed by `serde_json`. Enabled by the `json` feature.
///
/// ```rust
/// use huddle_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ClientMessage::Say { text: "hi".into() }).unwrap();
/// let back: ClientMessage = codec.decode(&bytes).unwrap();
/// assert_eq!(back, ClientMessage::Say { text: "hi".into() });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ErrorCode, ServerMessage};

    #[test]
    fn test_decode_truncated_input_is_decode_error() {
        let res: Result<ServerMessage, _> = JsonCodec.decode(br#"{"type":"Wel"#);
        assert!(matches!(res, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_produces_utf8_json() {
        let bytes = JsonCodec
            .encode(&ServerMessage::Error {
                code: ErrorCode::Usage,
                message: "usage: /msg <nick> <message>".into(),
            })
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(r#"{"type":"Error""#));
    }
}
