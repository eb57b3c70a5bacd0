//! Display-name rules shared by the identity session and the chat router.

use crate::ConnectionId;

/// Longest display name accepted anywhere in Huddle.
pub const MAX_DISPLAY_NAME_LEN: usize = 32;

/// Why a display name was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("display name is empty")]
    Empty,
    /// Names are addressed in `/msg <nick> ...`, so they cannot contain
    /// whitespace.
    #[error("display name must not contain whitespace")]
    ContainsWhitespace,
    #[error("display name is longer than {max} characters")]
    TooLong { max: usize },
}

/// Trims `raw` and checks it against the naming rules.
///
/// `max_len` counts characters, not bytes.
pub fn validate_display_name(raw: &str, max_len: usize) -> Result<&str, NameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(NameError::ContainsWhitespace);
    }
    if name.chars().count() > max_len {
        return Err(NameError::TooLong { max: max_len });
    }
    Ok(name)
}

/// Name used for a connection that never supplied one.
pub fn fallback_display_name(connection: ConnectionId) -> String {
    format!("Player_{}", connection.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_trims() {
        assert_eq!(validate_display_name("  Nick1 ", 32), Ok("Nick1"));
    }

    #[test]
    fn test_validate_display_name_rejects_empty() {
        assert_eq!(validate_display_name("   ", 32), Err(NameError::Empty));
    }

    #[test]
    fn test_validate_display_name_rejects_inner_space() {
        assert_eq!(
            validate_display_name("Big Nick", 32),
            Err(NameError::ContainsWhitespace)
        );
    }

    #[test]
    fn test_validate_display_name_counts_chars() {
        // Four two-byte characters fit in a four-character limit.
        assert_eq!(validate_display_name("éééé", 4), Ok("éééé"));
        assert_eq!(
            validate_display_name("ééééé", 4),
            Err(NameError::TooLong { max: 4 })
        );
    }

    #[test]
    fn test_fallback_display_name_uses_connection_number() {
        assert_eq!(fallback_display_name(ConnectionId::new(3)), "Player_3");
    }

    #[test]
    fn test_fallback_display_name_passes_validation() {
        let name = fallback_display_name(ConnectionId::new(u64::MAX));
        assert_eq!(validate_display_name(&name, MAX_DISPLAY_NAME_LEN), Ok(name.as_str()));
    }
}
