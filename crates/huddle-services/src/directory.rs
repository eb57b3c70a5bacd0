//! Room directory: the service that lists rooms and tracks membership.
//!
//! [`RoomDirectory`] is the raw service interface. [`RoomDirectoryClient`]
//! is what the rest of Huddle calls: it validates requests locally before
//! anything goes over the network and logs each call.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use huddle_protocol::{
    JoinCode, MAX_ROOM_CAPACITY, MIN_ROOM_CAPACITY, Participant, RELAY_JOIN_CODE_KEY, Room, RoomId,
};

use crate::DirectoryError;

/// Longest room name the client will send.
pub const MAX_ROOM_NAME_LEN: usize = 64;

/// Options for [`RoomDirectory::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    /// Private rooms are left out of [`RoomDirectory::query`] results and
    /// can only be joined by id.
    pub is_private: bool,
    /// Owner of the new room.
    pub creator: Participant,
    /// When `true`, the creator owns the room without taking a member
    /// slot (dedicated server).
    pub dedicated: bool,
}

/// Filters for [`RoomDirectory::query`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Include rooms with no free slot.
    pub include_full: bool,
    /// Cap on the number of rooms returned.
    pub limit: Option<usize>,
}

/// The room directory service.
///
/// Implementations keep `members.len() <= capacity` and never list
/// private rooms in `query`.
pub trait RoomDirectory: Send + Sync + 'static {
    fn create(
        &self,
        name: &str,
        capacity: usize,
        options: CreateOptions,
    ) -> impl Future<Output = Result<Room, DirectoryError>> + Send;

    fn query(
        &self,
        options: QueryOptions,
    ) -> impl Future<Output = Result<Vec<Room>, DirectoryError>> + Send;

    /// Adds `participant` to the room. Joining a room one is already in
    /// returns the room unchanged.
    fn join_by_id(
        &self,
        room: &RoomId,
        participant: Participant,
    ) -> impl Future<Output = Result<Room, DirectoryError>> + Send;

    /// Merges `metadata` into the room's metadata.
    fn update_metadata(
        &self,
        room: &RoomId,
        metadata: BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Room, DirectoryError>> + Send;

    fn get(&self, room: &RoomId) -> impl Future<Output = Result<Room, DirectoryError>> + Send;

    /// Liveness ping from the room owner.
    fn heartbeat(&self, room: &RoomId) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    fn delete(&self, room: &RoomId) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}

/// Validating, cloneable front end for a [`RoomDirectory`].
#[derive(Debug)]
pub struct RoomDirectoryClient<D> {
    inner: Arc<D>,
}

impl<D> Clone for RoomDirectoryClient<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: RoomDirectory> RoomDirectoryClient<D> {
    pub fn new(directory: D) -> Self {
        Self {
            inner: Arc::new(directory),
        }
    }

    /// Creates a room after checking the name and capacity.
    ///
    /// # Errors
    /// [`DirectoryError::InvalidRequest`] for an empty or over-long name,
    /// or a capacity outside `2..=100`; nothing is sent in that case.
    pub async fn create(
        &self,
        name: &str,
        capacity: usize,
        options: CreateOptions,
    ) -> Result<Room, DirectoryError> {
        let name = validate_room_name(name)?;
        validate_capacity(capacity)?;
        let room = self.inner.create(name, capacity, options).await?;
        tracing::info!(room = %room.id, name, capacity, "room created");
        Ok(room)
    }

    pub async fn query(&self, options: QueryOptions) -> Result<Vec<Room>, DirectoryError> {
        let rooms = self.inner.query(options).await?;
        tracing::debug!(count = rooms.len(), "rooms queried");
        Ok(rooms)
    }

    pub async fn join_by_id(
        &self,
        room: &RoomId,
        participant: Participant,
    ) -> Result<Room, DirectoryError> {
        let participant_id = participant.id.clone();
        let joined = self.inner.join_by_id(room, participant).await?;
        tracing::info!(%room, participant = %participant_id, "joined room");
        Ok(joined)
    }

    pub async fn update_metadata(
        &self,
        room: &RoomId,
        metadata: BTreeMap<String, String>,
    ) -> Result<Room, DirectoryError> {
        self.inner.update_metadata(room, metadata).await
    }

    /// Publishes the relay join code, which makes the room joinable.
    pub async fn publish_join_code(
        &self,
        room: &RoomId,
        code: &JoinCode,
    ) -> Result<Room, DirectoryError> {
        let metadata = BTreeMap::from([(RELAY_JOIN_CODE_KEY.to_owned(), code.to_string())]);
        let updated = self.inner.update_metadata(room, metadata).await?;
        tracing::info!(%room, %code, "relay join code published");
        Ok(updated)
    }

    pub async fn get(&self, room: &RoomId) -> Result<Room, DirectoryError> {
        self.inner.get(room).await
    }

    pub async fn heartbeat(&self, room: &RoomId) -> Result<(), DirectoryError> {
        self.inner.heartbeat(room).await?;
        tracing::debug!(%room, "room heartbeat sent");
        Ok(())
    }

    pub async fn delete(&self, room: &RoomId) -> Result<(), DirectoryError> {
        self.inner.delete(room).await?;
        tracing::info!(%room, "room deleted");
        Ok(())
    }
}

fn validate_room_name(name: &str) -> Result<&str, DirectoryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DirectoryError::InvalidRequest("room name is empty".into()));
    }
    if name.chars().count() > MAX_ROOM_NAME_LEN {
        return Err(DirectoryError::InvalidRequest(format!(
            "room name is longer than {MAX_ROOM_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

fn validate_capacity(capacity: usize) -> Result<(), DirectoryError> {
    if !(MIN_ROOM_CAPACITY..=MAX_ROOM_CAPACITY).contains(&capacity) {
        return Err(DirectoryError::InvalidRequest(format!(
            "capacity must be between {MIN_ROOM_CAPACITY} and {MAX_ROOM_CAPACITY}, got {capacity}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDirectory;
    use huddle_protocol::ParticipantId;

    fn creator() -> CreateOptions {
        CreateOptions {
            is_private: false,
            creator: Participant {
                id: ParticipantId::new("owner"),
                display_name: "Owner".into(),
                is_room_owner: true,
            },
            dedicated: false,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name_without_calling_service() {
        let directory = MemoryDirectory::new();
        let client = RoomDirectoryClient::new(directory.clone());
        let err = client.create("   ", 4, creator()).await.unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidRequest(_)));
        assert_eq!(directory.room_count(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_long_name() {
        let client = RoomDirectoryClient::new(MemoryDirectory::new());
        let name = "n".repeat(MAX_ROOM_NAME_LEN + 1);
        assert!(client.create(&name, 4, creator()).await.is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_capacity_out_of_range() {
        let client = RoomDirectoryClient::new(MemoryDirectory::new());
        assert!(client.create("Alpha", 1, creator()).await.is_err());
        assert!(client.create("Alpha", 101, creator()).await.is_err());
        assert!(client.create("Alpha", 2, creator()).await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_join_code_makes_room_joinable() {
        let client = RoomDirectoryClient::new(MemoryDirectory::new());
        let room = client.create("Alpha", 4, creator()).await.unwrap();
        assert!(!room.is_joinable());

        let code = JoinCode::parse("AB12CD").unwrap();
        let room = client.publish_join_code(&room.id, &code).await.unwrap();
        assert_eq!(room.relay_join_code(), Some("AB12CD"));
    }
}
