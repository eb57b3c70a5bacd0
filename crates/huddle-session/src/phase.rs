use std::fmt;

/// Where a [`SessionCoordinator`](crate::SessionCoordinator) is in the
/// room lifecycle.
///
/// ```text
/// Idle → CreatingOrJoining → InRoom → Heartbeating → Leaving → Idle
///                  ↘ (failure) Idle
/// any → Closed (terminal)
/// ```
///
/// `Heartbeating` is `InRoom` with a live heartbeat loop; stopping the
/// loop drops back to `InRoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    CreatingOrJoining,
    InRoom,
    Heartbeating,
    Leaving,
    Closed,
}

impl Phase {
    /// Whether the coordinator currently holds a room.
    pub fn is_in_room(self) -> bool {
        matches!(self, Self::InRoom | Self::Heartbeating)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CreatingOrJoining => "creating-or-joining",
            Self::InRoom => "in-room",
            Self::Heartbeating => "heartbeating",
            Self::Leaving => "leaving",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
