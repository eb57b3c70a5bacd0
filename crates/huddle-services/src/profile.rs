//! Profile storage for display names.

use std::future::Future;

use huddle_protocol::ParticipantId;

use crate::ProfileError;

/// Persists per-participant nicknames between sessions.
///
/// The room host reads it to name connections that register without a
/// display name; clients write it when the player picks a nickname.
pub trait ProfileStore: Send + Sync + 'static {
    /// The saved nickname, or [`ProfileError::NotFound`].
    fn get_display_name(
        &self,
        id: &ParticipantId,
    ) -> impl Future<Output = Result<String, ProfileError>> + Send;

    /// Replaces the saved nickname.
    fn set_display_name(
        &self,
        id: &ParticipantId,
        name: &str,
    ) -> impl Future<Output = Result<(), ProfileError>> + Send;
}
