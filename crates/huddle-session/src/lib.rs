//! Room lifecycle for a Huddle participant.
//!
//! [`SessionCoordinator`] takes the local participant from "signed in" to
//! "in a room with relay parameters" and back:
//!
//! ```text
//! create_room:  directory create → relay allocate → join code → publish code
//! join_room:    directory join → check code → relay resolve
//! in a room:    heartbeat loop (owner ping + snapshot refresh)
//! leave:        stop heartbeat, forget the room
//! ```
//!
//! Progress is reported through [`SessionEvent`]s on a broadcast channel
//! and through the [`Phase`] watch channel.

mod config;
mod coordinator;
mod error;
mod events;
mod heartbeat;
mod phase;
mod state;

pub use config::SessionConfig;
pub use coordinator::{CreatedRoom, JoinedRoom, RoomRequest, SessionCoordinator};
pub use error::SessionError;
pub use events::{SessionEvent, TransportRole};
pub use phase::Phase;
