//! Chat events and delivery targets.
//!
//! The room host never sends a bare string to a client. Every chat line
//! is a [`ChatEvent`] carrying its room-wide sequence number, and every
//! event leaves the router paired with a [`Recipient`] in a [`Dispatch`].

use serde::{Deserialize, Serialize};

use crate::{ConnectionId, ParticipantId};

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who receives a chat event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", content = "connections", rename_all = "snake_case")]
pub enum Recipient {
    /// Every connection in the room.
    All,
    /// Exactly these connections. Never contains duplicates.
    Only(Vec<ConnectionId>),
}

impl Recipient {
    /// Builds an [`Recipient::Only`] set, dropping repeated ids while
    /// keeping first-seen order.
    pub fn only(connections: impl IntoIterator<Item = ConnectionId>) -> Self {
        let mut unique: Vec<ConnectionId> = Vec::new();
        for connection in connections {
            if !unique.contains(&connection) {
                unique.push(connection);
            }
        }
        Self::Only(unique)
    }

    /// Whether `connection` is in the delivery set.
    pub fn includes(&self, connection: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(&connection),
        }
    }
}

// ---------------------------------------------------------------------------
// ChatEvent
// ---------------------------------------------------------------------------

/// What produced a chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// Public line from a participant.
    Broadcast,
    /// Private line between two participants.
    Directed,
    /// Notice generated by the room host (joins, leaves, lookup failures).
    System,
}

/// One sequenced chat line.
///
/// `sequence` is assigned by the room host and strictly increases across
/// all kinds, so clients can order lines and detect gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub sequence: u64,
    pub kind: ChatKind,
    /// Submitting connection. `None` for notices about the room itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<ConnectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_identity: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Addressed name for directed lines and "not found" notices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    /// Raw message body as submitted.
    pub body: String,
    /// Rendered line ready for display.
    pub text: String,
}

impl ChatEvent {
    /// Renders a public line: `[name]: body`.
    pub fn render_broadcast(name: &str, body: &str) -> String {
        format!("[{name}]: {body}")
    }

    /// Renders a private line: `[private from name]: body`.
    pub fn render_directed(name: &str, body: &str) -> String {
        format!("[private from {name}]: {body}")
    }

    /// Renders a host notice: `[SYSTEM]: notice`.
    pub fn render_system(notice: &str) -> String {
        format!("[SYSTEM]: {notice}")
    }
}

/// A sequenced event and where it must go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub event: ChatEvent,
    pub recipient: Recipient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_only_deduplicates() {
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(2);
        assert_eq!(Recipient::only([a, b, a]), Recipient::Only(vec![a, b]));
        // Sending to yourself collapses to one delivery.
        assert_eq!(Recipient::only([a, a]), Recipient::Only(vec![a]));
    }

    #[test]
    fn test_recipient_includes() {
        let a = ConnectionId::new(1);
        assert!(Recipient::All.includes(a));
        assert!(!Recipient::only([ConnectionId::new(2)]).includes(a));
    }

    #[test]
    fn test_render_lines() {
        assert_eq!(ChatEvent::render_broadcast("Nick1", "hi"), "[Nick1]: hi");
        assert_eq!(
            ChatEvent::render_directed("Nick1", "psst"),
            "[private from Nick1]: psst"
        );
        assert_eq!(ChatEvent::render_system("ok"), "[SYSTEM]: ok");
    }

    #[test]
    fn test_chat_event_omits_empty_optionals() {
        let event = ChatEvent {
            sequence: 3,
            kind: ChatKind::System,
            sender: None,
            sender_identity: None,
            sender_name: None,
            target_name: None,
            body: "x".into(),
            text: "[SYSTEM]: x".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "system");
        assert!(json.get("sender").is_none());
        assert!(json.get("target_name").is_none());
    }
}
