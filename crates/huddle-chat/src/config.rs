use huddle_protocol::MAX_DISPLAY_NAME_LEN;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Rules the [`EventRouter`](crate::EventRouter) enforces on submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Refuse to register a display name another connection holds.
    ///
    /// With this off, directed messages go to the first connection that
    /// registered the name.
    pub unique_names: bool,

    /// Longest display name, in characters.
    pub max_name_len: usize,

    /// Longest message body, in characters.
    pub max_body_len: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            unique_names: true,
            max_name_len: MAX_DISPLAY_NAME_LEN,
            max_body_len: Self::DEFAULT_MAX_BODY_LEN,
        }
    }
}

impl RouterConfig {
    pub const DEFAULT_MAX_BODY_LEN: usize = 500;

    /// Returns a copy with out-of-range limits corrected.
    ///
    /// `max_name_len` is kept within `1..=MAX_DISPLAY_NAME_LEN`; a zero
    /// `max_body_len` falls back to the default.
    pub fn validated(mut self) -> Self {
        let clamped = self.max_name_len.clamp(1, MAX_DISPLAY_NAME_LEN);
        if clamped != self.max_name_len {
            warn!(
                requested = self.max_name_len,
                used = clamped,
                "max_name_len out of range, clamping"
            );
            self.max_name_len = clamped;
        }
        if self.max_body_len == 0 {
            warn!("max_body_len is zero, using default");
            self.max_body_len = Self::DEFAULT_MAX_BODY_LEN;
        }
        self
    }
}
