//! Room host configuration.

use std::str::FromStr;
use std::time::Duration;

use huddle_chat::RouterConfig;
use huddle_gate::GateConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::HuddleError;

// ---------------------------------------------------------------------------
// HostConfig
// ---------------------------------------------------------------------------

/// Settings for one [`RoomHost`](crate::RoomHost).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Listen address, `host:port`.
    pub bind: String,

    /// A new connection must send `Register` within this time.
    pub register_timeout: Duration,

    /// Connections that send no application message for this long are
    /// closed. WebSocket ping and pong frames do not count as activity.
    pub idle_timeout: Duration,

    /// How often the room advances the gate's countdowns.
    pub tick_rate_hz: u32,

    /// Bound of the room actor's command queue.
    pub command_buffer: usize,

    pub router: RouterConfig,
    pub gate: GateConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            register_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
            tick_rate_hz: 10,
            command_buffer: 256,
            router: RouterConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

impl HostConfig {
    /// Highest supported gate tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 120;

    /// Returns a copy with out-of-range values corrected.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.register_timeout.is_zero() {
            warn!("register_timeout is zero, using default");
            self.register_timeout = defaults.register_timeout;
        }
        if self.idle_timeout.is_zero() {
            warn!("idle_timeout is zero, using default");
            self.idle_timeout = defaults.idle_timeout;
        }
        if self.tick_rate_hz == 0 {
            warn!("tick_rate_hz is zero, using default");
            self.tick_rate_hz = defaults.tick_rate_hz;
        } else if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self.command_buffer = self.command_buffer.max(1);
        self.router = self.router.validated();
        self.gate = self.gate.validated();
        self
    }

    /// Time between gate ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }

    /// Defaults overridden by `HUDDLE_*` environment variables.
    ///
    /// | Variable                        | Field              |
    /// |---------------------------------|--------------------|
    /// | `HUDDLE_BIND`                   | `bind`             |
    /// | `HUDDLE_REGISTER_TIMEOUT_SECS`  | `register_timeout` |
    /// | `HUDDLE_IDLE_TIMEOUT_SECS`      | `idle_timeout`     |
    /// | `HUDDLE_TICK_RATE_HZ`           | `tick_rate_hz`     |
    /// | `HUDDLE_GATE_WINDOW_SECS`       | `gate.window`      |
    /// | `HUDDLE_GATE_REQUIRED`          | `gate.required`    |
    /// | `HUDDLE_UNIQUE_NAMES`           | `router.unique_names` |
    ///
    /// # Errors
    /// [`HuddleError::Config`] if a variable is set but does not parse.
    pub fn from_env() -> Result<Self, HuddleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HuddleError> {
        let mut config = Self::default();
        if let Some(bind) = lookup("HUDDLE_BIND") {
            config.bind = bind;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "HUDDLE_REGISTER_TIMEOUT_SECS")? {
            config.register_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "HUDDLE_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(hz) = parse_var(&lookup, "HUDDLE_TICK_RATE_HZ")? {
            config.tick_rate_hz = hz;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "HUDDLE_GATE_WINDOW_SECS")? {
            config.gate.window = Duration::from_secs(secs);
        }
        if let Some(required) = parse_var(&lookup, "HUDDLE_GATE_REQUIRED")? {
            config.gate.required = required;
        }
        if let Some(unique) = parse_var(&lookup, "HUDDLE_UNIQUE_NAMES")? {
            config.router.unique_names = unique;
        }
        Ok(config.validated())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, HuddleError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| HuddleError::Config(format!("{key}={raw:?} is not valid")))
}
