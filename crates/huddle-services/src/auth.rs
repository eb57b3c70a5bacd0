//! Participant identity.
//!
//! Huddle does not authenticate anyone itself. An [`AuthProvider`]
//! (anonymous sign-in, platform account, custom backend) hands out a
//! [`ParticipantId`], and [`IdentitySession`] keeps that id plus the
//! chosen display name for the rest of the process.

use std::future::Future;

use huddle_protocol::{MAX_DISPLAY_NAME_LEN, Participant, ParticipantId, validate_display_name};

use crate::{AuthError, ProfileError, ProfileStore};

/// Issues participant identities.
///
/// # Example
///
/// ```rust
/// use huddle_protocol::ParticipantId;
/// use huddle_services::{AuthError, AuthProvider};
///
/// /// Every process is the same player. Local testing only.
/// struct FixedAuth(ParticipantId);
///
/// impl AuthProvider for FixedAuth {
///     async fn sign_in(&self) -> Result<ParticipantId, AuthError> {
///         Ok(self.0.clone())
///     }
///
///     fn current_identity(&self) -> Option<ParticipantId> {
///         Some(self.0.clone())
///     }
/// }
/// ```
pub trait AuthProvider: Send + Sync + 'static {
    /// Signs in and returns the identity. Calling it again after success
    /// returns the same identity.
    fn sign_in(&self) -> impl Future<Output = Result<ParticipantId, AuthError>> + Send;

    /// The identity from the last successful sign-in, if any.
    fn current_identity(&self) -> Option<ParticipantId>;
}

/// The local participant: who we are and what we are called.
#[derive(Debug)]
pub struct IdentitySession<A> {
    auth: A,
    participant_id: Option<ParticipantId>,
    display_name: Option<String>,
}

impl<A: AuthProvider> IdentitySession<A> {
    /// Wraps a provider. Nothing happens until [`sign_in`](Self::sign_in).
    pub fn new(auth: A) -> Self {
        Self {
            auth,
            participant_id: None,
            display_name: None,
        }
    }

    /// Signs in once per process; later calls return the cached id.
    pub async fn sign_in(&mut self) -> Result<ParticipantId, AuthError> {
        if let Some(id) = &self.participant_id {
            return Ok(id.clone());
        }
        let id = match self.auth.current_identity() {
            Some(id) => id,
            None => self.auth.sign_in().await?,
        };
        tracing::info!(participant = %id, "signed in");
        self.participant_id = Some(id.clone());
        Ok(id)
    }

    pub fn is_signed_in(&self) -> bool {
        self.participant_id.is_some()
    }

    pub fn participant_id(&self) -> Option<&ParticipantId> {
        self.participant_id.as_ref()
    }

    /// Like [`participant_id`](Self::participant_id), as an error when
    /// missing.
    pub fn require_participant_id(&self) -> Result<&ParticipantId, AuthError> {
        self.participant_id.as_ref().ok_or(AuthError::NotSignedIn)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Sets the nickname shown in rooms and chat.
    ///
    /// The name is trimmed; empty names, names with inner whitespace and
    /// names over [`MAX_DISPLAY_NAME_LEN`] characters are refused.
    pub fn set_display_name(&mut self, name: &str) -> Result<(), AuthError> {
        let name = validate_display_name(name, MAX_DISPLAY_NAME_LEN)?;
        self.display_name = Some(name.to_owned());
        Ok(())
    }

    /// Loads the saved nickname for the signed-in participant.
    ///
    /// Returns `Ok(None)` and keeps the current name when no profile has
    /// been saved yet. A stored name that no longer passes validation is
    /// ignored the same way.
    pub async fn load_display_name<P: ProfileStore>(
        &mut self,
        profiles: &P,
    ) -> Result<Option<String>, AuthError> {
        let id = self.require_participant_id()?.clone();
        let stored = match profiles.get_display_name(&id).await {
            Ok(name) => name,
            Err(ProfileError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match validate_display_name(&stored, MAX_DISPLAY_NAME_LEN) {
            Ok(name) => {
                self.display_name = Some(name.to_owned());
                Ok(Some(name.to_owned()))
            }
            Err(e) => {
                tracing::warn!(participant = %id, error = %e, "ignoring stored display name");
                Ok(None)
            }
        }
    }

    /// Saves the current nickname to the profile store.
    pub async fn save_display_name<P: ProfileStore>(&self, profiles: &P) -> Result<(), AuthError> {
        let id = self.require_participant_id()?;
        let name = self
            .display_name
            .as_deref()
            .ok_or(AuthError::InvalidName(huddle_protocol::NameError::Empty))?;
        profiles.set_display_name(id, name).await?;
        Ok(())
    }

    /// This participant as a room member record.
    ///
    /// Without a chosen nickname, the raw participant id is used.
    pub fn participant(&self, is_room_owner: bool) -> Result<Participant, AuthError> {
        let id = self.require_participant_id()?.clone();
        let display_name = self
            .display_name
            .clone()
            .unwrap_or_else(|| id.as_str().to_owned());
        Ok(Participant {
            id,
            display_name,
            is_room_owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryAuth, MemoryProfiles};

    fn session() -> IdentitySession<MemoryAuth> {
        IdentitySession::new(MemoryAuth::with_identity("p-1"))
    }

    #[tokio::test]
    async fn test_sign_in_is_cached() {
        let mut identity = IdentitySession::new(MemoryAuth::new());
        let first = identity.sign_in().await.unwrap();
        let second = identity.sign_in().await.unwrap();
        assert_eq!(first, second);
        assert!(identity.is_signed_in());
    }

    #[tokio::test]
    async fn test_sign_in_rejected_stays_signed_out() {
        let mut identity = IdentitySession::new(MemoryAuth::rejecting("banned"));
        let err = identity.sign_in().await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert!(!identity.is_signed_in());
    }

    #[test]
    fn test_participant_before_sign_in_fails() {
        let identity = session();
        assert!(matches!(
            identity.participant(false),
            Err(AuthError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_participant_defaults_name_to_id() {
        let mut identity = session();
        identity.sign_in().await.unwrap();
        let me = identity.participant(true).unwrap();
        assert_eq!(me.display_name, "p-1");
        assert!(me.is_room_owner);
    }

    #[test]
    fn test_set_display_name_trims_and_validates() {
        let mut identity = session();
        identity.set_display_name("  Nick1 ").unwrap();
        assert_eq!(identity.display_name(), Some("Nick1"));
        assert!(identity.set_display_name("two words").is_err());
        assert!(identity.set_display_name(&"x".repeat(33)).is_err());
        // A refused name leaves the previous one in place.
        assert_eq!(identity.display_name(), Some("Nick1"));
    }

    #[tokio::test]
    async fn test_load_display_name_missing_profile_keeps_current() {
        let profiles = MemoryProfiles::new();
        let mut identity = session();
        identity.sign_in().await.unwrap();
        identity.set_display_name("Local").unwrap();

        let loaded = identity.load_display_name(&profiles).await.unwrap();
        assert_eq!(loaded, None);
        assert_eq!(identity.display_name(), Some("Local"));
    }

    #[tokio::test]
    async fn test_save_then_load_display_name() {
        let profiles = MemoryProfiles::new();
        let mut identity = session();
        identity.sign_in().await.unwrap();
        identity.set_display_name("Nick1").unwrap();
        identity.save_display_name(&profiles).await.unwrap();

        let mut again = session();
        again.sign_in().await.unwrap();
        let loaded = again.load_display_name(&profiles).await.unwrap();
        assert_eq!(loaded.as_deref(), Some("Nick1"));
        assert_eq!(again.display_name(), Some("Nick1"));
    }
}
