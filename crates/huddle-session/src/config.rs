use std::time::Duration;

use huddle_protocol::TransportMode;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings for a [`SessionCoordinator`](crate::SessionCoordinator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Time between room heartbeats. Must stay well under the directory's
    /// room expiry.
    pub heartbeat_interval: Duration,

    /// Relay transport mode for both allocation and join-code resolution.
    pub transport_mode: TransportMode,

    /// Buffered notifications per subscriber before the slowest one
    /// starts losing events.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            transport_mode: TransportMode::default(),
            event_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Shortest heartbeat interval accepted.
    pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

    /// Returns a copy with out-of-range values corrected.
    pub fn validated(mut self) -> Self {
        if self.heartbeat_interval < Self::MIN_HEARTBEAT_INTERVAL {
            warn!(
                interval = ?self.heartbeat_interval,
                min = ?Self::MIN_HEARTBEAT_INTERVAL,
                "heartbeat interval too short, clamping"
            );
            self.heartbeat_interval = Self::MIN_HEARTBEAT_INTERVAL;
        }
        if self.event_capacity == 0 {
            self.event_capacity = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_heartbeat_is_fifteen_seconds_dtls() {
        let config = SessionConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.transport_mode, TransportMode::Dtls);
    }

    #[test]
    fn test_validated_clamps_interval_and_capacity() {
        let config = SessionConfig {
            heartbeat_interval: Duration::from_millis(10),
            transport_mode: TransportMode::Udp,
            event_capacity: 0,
        }
        .validated();
        assert_eq!(config.heartbeat_interval, SessionConfig::MIN_HEARTBEAT_INTERVAL);
        assert_eq!(config.event_capacity, 1);
    }
}
