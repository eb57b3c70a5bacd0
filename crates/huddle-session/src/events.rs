//! Notifications published by the coordinator.

use huddle_protocol::{ConnectionParams, Room, RoomId};

/// Which side of the relay this process takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportRole {
    /// Room owner that also plays.
    Host,
    /// Dedicated server: owns the room, does not play.
    Server,
    /// Joined someone else's room.
    Client,
}

/// Delivered to every [`subscribe`](crate::SessionCoordinator::subscribe)r.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Relay parameters are ready; start the transport in `role`.
    TransportReady {
        role: TransportRole,
        params: ConnectionParams,
    },
    /// Fresh room snapshot from a heartbeat tick.
    RoomUpdated(Room),
    /// The directory dropped the room. The coordinator is `Idle` again.
    RoomClosed { room_id: RoomId },
    /// This participant left the room.
    Left { room_id: RoomId },
}
