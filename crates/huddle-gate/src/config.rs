//! Gate configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use huddle_protocol::ActuatorId;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a [`CoordinatedGate`](crate::CoordinatedGate) decides to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// How long one actuation stays live.
    pub window: Duration,

    /// Distinct live actuators needed to open.
    pub required: usize,

    /// Actuators this gate accepts. `None` accepts any id.
    pub actuators: Option<BTreeSet<ActuatorId>>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            window: Self::DEFAULT_WINDOW,
            required: Self::DEFAULT_REQUIRED,
            actuators: None,
        }
    }
}

impl GateConfig {
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);
    pub const DEFAULT_REQUIRED: usize = 2;

    /// The classic two-switch door: actuators `"A"` and `"B"`.
    pub fn pair(a: &str, b: &str) -> Self {
        Self {
            actuators: Some(BTreeSet::from([ActuatorId::new(a), ActuatorId::new(b)])),
            ..Self::default()
        }
    }

    /// Returns a copy with out-of-range values corrected.
    ///
    /// Called by [`CoordinatedGate::new`](crate::CoordinatedGate::new). Rules:
    /// - a zero `window` falls back to [`Self::DEFAULT_WINDOW`];
    /// - `required` is at least 1;
    /// - with an allow-set, `required` is at most its size, otherwise the
    ///   gate could never open.
    pub fn validated(mut self) -> Self {
        if self.window.is_zero() {
            warn!("gate window is zero, using default");
            self.window = Self::DEFAULT_WINDOW;
        }
        if self.required == 0 {
            warn!("gate requires zero actuators, clamping to 1");
            self.required = 1;
        }
        if let Some(allowed) = &self.actuators {
            let max = allowed.len().max(1);
            if self.required > max {
                warn!(
                    required = self.required,
                    actuators = allowed.len(),
                    "gate requires more actuators than exist, clamping"
                );
                self.required = max;
            }
        }
        self
    }

    /// Whether `actuator` may drive this gate.
    pub fn allows(&self, actuator: &ActuatorId) -> bool {
        self.actuators
            .as_ref()
            .is_none_or(|allowed| allowed.contains(actuator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_two_of_any_in_ten_seconds() {
        let config = GateConfig::default();
        assert_eq!(config.window, Duration::from_secs(10));
        assert_eq!(config.required, 2);
        assert!(config.allows(&ActuatorId::new("anything")));
    }

    #[test]
    fn test_validated_fixes_zero_window_and_required() {
        let config = GateConfig {
            window: Duration::ZERO,
            required: 0,
            actuators: None,
        }
        .validated();
        assert_eq!(config.window, GateConfig::DEFAULT_WINDOW);
        assert_eq!(config.required, 1);
    }

    #[test]
    fn test_validated_clamps_required_to_allow_set() {
        let config = GateConfig {
            required: 5,
            ..GateConfig::pair("A", "B")
        }
        .validated();
        assert_eq!(config.required, 2);
    }

    #[test]
    fn test_pair_allows_only_its_actuators() {
        let config = GateConfig::pair("A", "B");
        assert!(config.allows(&ActuatorId::new("A")));
        assert!(!config.allows(&ActuatorId::new("C")));
    }
}
