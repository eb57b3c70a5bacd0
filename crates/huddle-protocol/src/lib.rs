//! Shared vocabulary for Huddle.
//!
//! Everything more than one layer needs to agree on lives here:
//!
//! - **Identities** ([`ParticipantId`], [`RoomId`], [`ConnectionId`],
//!   [`ActuatorId`]) and the display-name rules.
//! - **Room model** ([`Room`], [`Participant`], [`JoinCode`],
//!   [`ConnectionParams`], [`RelaySession`]) as returned by the directory
//!   and relay services.
//! - **Chat** ([`ChatEvent`], [`Recipient`], [`Dispatch`]) as produced by
//!   the room host's router.
//! - **Wire** ([`ClientMessage`], [`ServerMessage`]) and the [`Codec`] that
//!   turns them into bytes.
//!
//! This crate does no I/O.

mod chat;
mod codec;
mod error;
mod ids;
mod names;
mod room;
mod wire;

pub use chat::{ChatEvent, ChatKind, Dispatch, Recipient};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use ids::{ActuatorId, ConnectionId, ParticipantId, RoomId};
pub use names::{MAX_DISPLAY_NAME_LEN, NameError, fallback_display_name, validate_display_name};
pub use room::{
    ConnectionParams, JoinCode, MAX_ROOM_CAPACITY, MIN_ROOM_CAPACITY, Participant,
    RELAY_JOIN_CODE_KEY, RelaySession, Room, TransportMode,
};
pub use wire::{ClientMessage, ErrorCode, ServerMessage};
