//! Room, participant, and relay connection types.
//!
//! These are snapshots: the room directory owns the real record, and the
//! client-visible [`Room`] is whatever the last `get`/`join` returned.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{ParticipantId, ProtocolError, RoomId};

/// Metadata key under which the room owner publishes the relay join code.
pub const RELAY_JOIN_CODE_KEY: &str = "relayJoinCode";

/// Smallest room that makes sense: the owner plus one guest.
pub const MIN_ROOM_CAPACITY: usize = 2;

/// Largest room the directory accepts.
pub const MAX_ROOM_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// One member of a room as seen by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identity assigned by the auth provider.
    pub id: ParticipantId,
    /// Nickname chosen before joining. Not guaranteed unique.
    pub display_name: String,
    /// `true` for the participant that created the room.
    pub is_room_owner: bool,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A directory-tracked room snapshot.
///
/// Invariants maintained by the directory:
/// - `members.len() <= capacity`
/// - `metadata[RELAY_JOIN_CODE_KEY]` is absent until the owner finished
///   relay allocation. Until then the room exists but is *not joinable*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub is_private: bool,
    pub capacity: usize,
    /// Identity of the creator. For dedicated-server rooms this is the
    /// server process's own identity, which never appears in `members`.
    pub owner: ParticipantId,
    /// Members in join order.
    pub members: Vec<Participant>,
    /// Small key-value bag (relay join code, game mode, ...).
    pub metadata: BTreeMap<String, String>,
    /// When the directory last received a liveness ping for this room.
    pub last_heartbeat_at: SystemTime,
}

impl Room {
    /// The published relay join code, if any.
    ///
    /// An empty or whitespace-only value counts as "not published": a
    /// joining participant must treat it exactly like a missing key.
    pub fn relay_join_code(&self) -> Option<&str> {
        self.metadata
            .get(RELAY_JOIN_CODE_KEY)
            .map(|code| code.trim())
            .filter(|code| !code.is_empty())
    }

    /// Whether other participants can join and connect right now.
    pub fn is_joinable(&self) -> bool {
        self.relay_join_code().is_some() && !self.is_full()
    }

    /// Whether every slot is taken.
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    /// Whether `participant` owns the room.
    pub fn is_owned_by(&self, participant: &ParticipantId) -> bool {
        &self.owner == participant
    }

    /// Whether `participant` is currently listed as a member.
    pub fn has_member(&self, participant: &ParticipantId) -> bool {
        self.members.iter().any(|m| &m.id == participant)
    }
}

// ---------------------------------------------------------------------------
// Relay types
// ---------------------------------------------------------------------------

/// Declared security mode of the relay connection.
///
/// The relay binds its connection parameters to one mode, so the same
/// mode must be used when allocating and when resolving a join code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Plain UDP.
    Udp,
    /// Encrypted UDP. Default.
    #[default]
    Dtls,
    /// Secure WebSocket, for browser clients.
    Wss,
}

impl TransportMode {
    /// Whether traffic in this mode is encrypted.
    pub fn is_secure(self) -> bool {
        !matches!(self, Self::Udp)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Dtls => f.write_str("dtls"),
            Self::Wss => f.write_str("wss"),
        }
    }
}

/// Short code a relay allocator resolves back into connection parameters.
///
/// Always 6–12 ASCII alphanumerics, stored upper-cased so that codes read
/// aloud or typed by hand compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JoinCode(String);

impl JoinCode {
    /// Shortest accepted code.
    pub const MIN_LEN: usize = 6;
    /// Longest accepted code.
    pub const MAX_LEN: usize = 12;

    /// Validates and normalizes a code.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim();
        let len = code.chars().count();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            return Err(ProtocolError::InvalidJoinCode(format!(
                "expected {}-{} characters, got {len}",
                Self::MIN_LEN,
                Self::MAX_LEN
            )));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ProtocolError::InvalidJoinCode(
                "only ASCII letters and digits are allowed".into(),
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Borrows the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JoinCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JoinCode> for String {
    fn from(code: JoinCode) -> Self {
        code.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a transport needs to reach the relay.
///
/// Opaque to Huddle beyond the declared `mode`; the transport layer knows
/// how to interpret `endpoint` and `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Relay server address (`host:port`).
    pub endpoint: String,
    /// Allocation the connection is bound to.
    pub allocation_id: String,
    /// Session key material for the secure modes.
    pub key: Vec<u8>,
    /// Transport mode the parameters were issued for.
    pub mode: TransportMode,
}

/// A relay allocation owned by the room host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySession {
    pub allocation_id: String,
    pub join_code: JoinCode,
    pub server_params: ConnectionParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with_metadata(metadata: &[(&str, &str)]) -> Room {
        Room {
            id: RoomId::new("r1"),
            name: "Alpha".into(),
            is_private: false,
            capacity: 4,
            owner: ParticipantId::new("owner"),
            members: vec![],
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            last_heartbeat_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_relay_join_code_absent_is_none() {
        let room = room_with_metadata(&[]);
        assert_eq!(room.relay_join_code(), None);
        assert!(!room.is_joinable());
    }

    #[test]
    fn test_relay_join_code_empty_is_none() {
        // An empty value must not be mistaken for a published code.
        let room = room_with_metadata(&[(RELAY_JOIN_CODE_KEY, "  ")]);
        assert_eq!(room.relay_join_code(), None);
    }

    #[test]
    fn test_relay_join_code_present() {
        let room = room_with_metadata(&[(RELAY_JOIN_CODE_KEY, "AB12CD")]);
        assert_eq!(room.relay_join_code(), Some("AB12CD"));
        assert!(room.is_joinable());
    }

    #[test]
    fn test_room_full_is_not_joinable() {
        let mut room = room_with_metadata(&[(RELAY_JOIN_CODE_KEY, "AB12CD")]);
        room.capacity = 2;
        for i in 0..2 {
            room.members.push(Participant {
                id: ParticipantId::new(format!("p{i}")),
                display_name: format!("Nick{i}"),
                is_room_owner: i == 0,
            });
        }
        assert!(room.is_full());
        assert!(!room.is_joinable());
        assert!(room.has_member(&ParticipantId::new("p1")));
    }

    #[test]
    fn test_join_code_parse_normalizes_case() {
        let code = JoinCode::parse(" ab12cd ").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_join_code_parse_rejects_bad_length() {
        assert!(JoinCode::parse("AB12").is_err());
        assert!(JoinCode::parse("ABCDEFGHIJKLM").is_err());
    }

    #[test]
    fn test_join_code_parse_rejects_symbols() {
        assert!(matches!(
            JoinCode::parse("AB-12CD"),
            Err(ProtocolError::InvalidJoinCode(_))
        ));
    }

    #[test]
    fn test_join_code_deserialize_validates() {
        let bad: Result<JoinCode, _> = serde_json::from_str("\"x\"");
        assert!(bad.is_err());
        let good: JoinCode = serde_json::from_str("\"zz99zz\"").unwrap();
        assert_eq!(good.as_str(), "ZZ99ZZ");
    }

    #[test]
    fn test_transport_mode_default_is_secure() {
        assert_eq!(TransportMode::default(), TransportMode::Dtls);
        assert!(TransportMode::default().is_secure());
        assert!(!TransportMode::Udp.is_secure());
        assert_eq!(TransportMode::Wss.to_string(), "wss");
    }
}
