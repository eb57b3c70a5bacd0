//! The gate state machine.

use std::collections::BTreeMap;
use std::time::Duration;

use huddle_protocol::ActuatorId;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{GateConfig, GateError};

/// Result of one [`CoordinatedGate::actuate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    /// This actuation completed the set; the gate is now open for good.
    Opened,
    /// Recorded. `active` distinct actuators are live, not yet enough.
    Pending { active: usize },
    /// The gate was already open; nothing changed.
    AlreadyOpen,
}

/// A gate that opens once enough distinct actuators fire within a window.
///
/// Each actuation arms a countdown for its actuator. The owner advances
/// the countdowns with [`tick`](Self::tick); an actuator whose countdown
/// reaches zero no longer counts. When `required` distinct countdowns are
/// live at once the gate latches open and stays open.
///
/// There is no internal clock: the room actor calls `tick` from its own
/// interval, so the gate is deterministic under test.
///
/// Observers subscribe through a `watch` channel, so one that subscribes
/// after the gate opened still reads `true`.
#[derive(Debug)]
pub struct CoordinatedGate {
    config: GateConfig,
    timers: BTreeMap<ActuatorId, Duration>,
    open: bool,
    observers: watch::Sender<bool>,
}

impl CoordinatedGate {
    pub fn new(config: GateConfig) -> Self {
        let (observers, _) = watch::channel(false);
        Self {
            config: config.validated(),
            timers: BTreeMap::new(),
            open: false,
            observers,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Receiver that reads `true` once the gate has opened.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.observers.subscribe()
    }

    /// Actuators whose countdown is still running.
    pub fn active_actuators(&self) -> impl Iterator<Item = &ActuatorId> {
        self.timers.keys()
    }

    /// Time left for `actuator`, if it is live.
    pub fn remaining(&self, actuator: &ActuatorId) -> Option<Duration> {
        self.timers.get(actuator).copied()
    }

    /// Fires `actuator`.
    ///
    /// # Errors
    /// [`GateError::UnknownActuator`] if the config has an allow-set that
    /// does not contain `actuator`.
    pub fn actuate(&mut self, actuator: &ActuatorId) -> Result<Actuation, GateError> {
        if !self.config.allows(actuator) {
            return Err(GateError::UnknownActuator(actuator.clone()));
        }
        if self.open {
            return Ok(Actuation::AlreadyOpen);
        }

        self.timers.insert(actuator.clone(), self.config.window);
        let active = self.timers.len();
        if active < self.config.required {
            debug!(%actuator, active, required = self.config.required, "gate actuated");
            return Ok(Actuation::Pending { active });
        }

        self.open = true;
        self.timers.clear();
        self.observers.send_replace(true);
        info!(%actuator, "gate opened");
        Ok(Actuation::Opened)
    }

    /// Advances every countdown by `elapsed`, dropping expired ones.
    /// Does nothing once the gate is open.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.open {
            return;
        }
        self.timers.retain(|actuator, remaining| {
            *remaining = remaining.saturating_sub(elapsed);
            if remaining.is_zero() {
                debug!(%actuator, "actuation expired");
                false
            } else {
                true
            }
        });
    }
}

impl Default for CoordinatedGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}
