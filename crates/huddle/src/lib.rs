//! # Huddle
//!
//! Lobby, relay handoff and room hosting for small multiplayer sessions.
//!
//! The workspace splits into one crate per concern; this meta-crate
//! re-exports them and adds the authoritative room host:
//!
//! - [`session`]: [`SessionCoordinator`] takes a participant into and out
//!   of rooms and keeps the room record alive with a heartbeat.
//! - [`services`]: identity, room directory, relay and profile seams, with
//!   in-memory implementations.
//! - [`chat`]: the sequencing [`EventRouter`].
//! - [`gate`]: the two-switch [`CoordinatedGate`].
//! - [`RoomHost`]: a WebSocket server running one room actor that owns a
//!   router and a gate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use huddle::prelude::*;
//! use huddle::services::memory::MemoryProfiles;
//!
//! # async fn run() -> Result<(), HuddleError> {
//! let host = RoomHost::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(MemoryProfiles::new())
//!     .await?;
//! host.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod room;
mod server;

pub use huddle_chat as chat;
pub use huddle_gate as gate;
pub use huddle_protocol as protocol;
pub use huddle_services as services;
pub use huddle_session as session;
pub use huddle_transport as transport;

pub use config::HostConfig;
pub use error::{HuddleError, RoomError};
pub use room::{Outbox, RoomHandle, RoomInfo, spawn_room};
pub use server::{RoomHost, RoomHostBuilder};

pub use huddle_chat::EventRouter;
pub use huddle_gate::CoordinatedGate;
pub use huddle_session::SessionCoordinator;

/// The types most users need, in one import.
pub mod prelude {
    pub use crate::{HostConfig, HuddleError, RoomError, RoomHandle, RoomHost, RoomHostBuilder};
    pub use huddle_chat::{ChatCommand, EventRouter, RouterConfig, RouterError};
    pub use huddle_gate::{Actuation, CoordinatedGate, GateConfig, GateError};
    pub use huddle_protocol::{
        ActuatorId, ChatEvent, ChatKind, ClientMessage, ConnectionId, ErrorCode, JoinCode,
        ParticipantId, Recipient, Room, RoomId, ServerMessage, TransportMode,
    };
    pub use huddle_services::{IdentitySession, RoomDirectoryClient, RelayBroker};
    pub use huddle_session::{
        Phase, RoomRequest, SessionConfig, SessionCoordinator, SessionError, SessionEvent,
        TransportRole,
    };
}
