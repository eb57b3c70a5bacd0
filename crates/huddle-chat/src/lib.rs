//! Authoritative chat for a Huddle room.
//!
//! The [`EventRouter`] turns submissions into sequenced
//! [`ChatEvent`](huddle_protocol::ChatEvent)s and pairs each with its
//! recipients. [`ChatCommand`] parses typed input such as
//! `/msg <nick> <message>`.
//!
//! Nothing here does I/O; the room host delivers the resulting
//! [`Dispatch`](huddle_protocol::Dispatch)es.

mod command;
mod config;
mod error;
mod router;

pub use command::ChatCommand;
pub use config::RouterConfig;
pub use error::RouterError;
pub use router::EventRouter;
