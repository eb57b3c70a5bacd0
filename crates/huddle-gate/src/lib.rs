//! Coordinated gate for Huddle rooms.
//!
//! A [`CoordinatedGate`] opens when at least `required` distinct actuators
//! fire within a rolling `window` of each other, and then stays open. The
//! canonical use is a door that needs two players on two switches at the
//! same time.
//!
//! The gate holds no clock and no lock: it is owned by one room actor,
//! which feeds it actuations in arrival order and advances it with
//! [`CoordinatedGate::tick`].

mod config;
mod error;
mod gate;

pub use config::GateConfig;
pub use error::GateError;
pub use gate::{Actuation, CoordinatedGate};
