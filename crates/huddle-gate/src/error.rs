use huddle_protocol::ActuatorId;

/// Errors raised by a [`CoordinatedGate`](crate::CoordinatedGate).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The actuator is not part of this gate's configuration.
    #[error("unknown actuator {0}")]
    UnknownActuator(ActuatorId),
}
