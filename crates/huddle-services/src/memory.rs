//! In-process implementations of every service trait.
//!
//! Used for local play (the `huddle-host` binary with no external
//! services) and throughout the tests. Each type is a cheap handle over
//! shared state, so a test can keep one clone for inspection while the
//! code under test owns another.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use rand::Rng;
use tokio::time::Instant;

use huddle_protocol::{ConnectionParams, JoinCode, Participant, ParticipantId, Room, RoomId, TransportMode};

use crate::{
    Allocation, AuthError, AuthProvider, CreateOptions, DirectoryError, ProfileError, ProfileStore,
    QueryOptions, RelayAllocator, RelayError, RoomDirectory,
};

/// Rooms not heartbeated for this long disappear from [`MemoryDirectory`].
pub const DEFAULT_ROOM_TTL: Duration = Duration::from_secs(30);

const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const JOIN_CODE_LEN: usize = 6;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Random lowercase hex string of `bytes * 2` characters.
fn random_hex(bytes: usize) -> String {
    let mut rng = rand::rng();
    (0..bytes)
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect()
}

fn random_key() -> Vec<u8> {
    rand::rng().random::<[u8; 16]>().to_vec()
}

fn random_join_code() -> String {
    let mut rng = rand::rng();
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

// ---------------------------------------------------------------------------
// MemoryAuth
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct AuthState {
    identity: Option<ParticipantId>,
    reject: Option<String>,
}

/// Anonymous sign-in: the first `sign_in` mints a random identity.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuth {
    state: Arc<Mutex<AuthState>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Already signed in as `id`.
    pub fn with_identity(id: impl Into<String>) -> Self {
        let auth = Self::default();
        lock(&auth.state).identity = Some(ParticipantId::new(id));
        auth
    }

    /// Every `sign_in` fails with [`AuthError::Rejected`].
    pub fn rejecting(reason: impl Into<String>) -> Self {
        let auth = Self::default();
        lock(&auth.state).reject = Some(reason.into());
        auth
    }
}

impl AuthProvider for MemoryAuth {
    async fn sign_in(&self) -> Result<ParticipantId, AuthError> {
        let mut state = lock(&self.state);
        if let Some(reason) = &state.reject {
            return Err(AuthError::Rejected(reason.clone()));
        }
        let id = state
            .identity
            .get_or_insert_with(|| ParticipantId::new(format!("p-{}", random_hex(8))));
        Ok(id.clone())
    }

    fn current_identity(&self) -> Option<ParticipantId> {
        lock(&self.state).identity.clone()
    }
}

// ---------------------------------------------------------------------------
// MemoryDirectory
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RoomEntry {
    room: Room,
    last_seen: Instant,
    heartbeats: u64,
}

#[derive(Debug)]
struct DirectoryState {
    rooms: Mutex<BTreeMap<RoomId, RoomEntry>>,
    ttl: Duration,
    unavailable: AtomicBool,
}

/// Room directory held in memory.
///
/// Rooms expire [`DEFAULT_ROOM_TTL`] after their last heartbeat (creation
/// counts as one) and then report [`DirectoryError::RoomNotFound`].
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    state: Arc<DirectoryState>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_ROOM_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            state: Arc::new(DirectoryState {
                rooms: Mutex::new(BTreeMap::new()),
                ttl,
                unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// While set, every call fails with [`DirectoryError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Rooms currently stored, expired or not.
    pub fn room_count(&self) -> usize {
        lock(&self.state.rooms).len()
    }

    /// Heartbeats received for `room` since creation.
    pub fn heartbeat_count(&self, room: &RoomId) -> Option<u64> {
        lock(&self.state.rooms).get(room).map(|e| e.heartbeats)
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.state.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("directory offline".into()));
        }
        Ok(())
    }

    fn is_expired(&self, entry: &RoomEntry, now: Instant) -> bool {
        now.duration_since(entry.last_seen) > self.state.ttl
    }

    /// Runs `f` on a live room, dropping it first if it expired.
    fn with_room<T>(
        &self,
        id: &RoomId,
        f: impl FnOnce(&mut RoomEntry) -> Result<T, DirectoryError>,
    ) -> Result<T, DirectoryError> {
        self.check_available()?;
        let mut rooms = lock(&self.state.rooms);
        let now = Instant::now();
        let expired = match rooms.get(id) {
            Some(entry) => self.is_expired(entry, now),
            None => return Err(DirectoryError::RoomNotFound(id.clone())),
        };
        if expired {
            rooms.remove(id);
            tracing::debug!(room = %id, "room expired");
            return Err(DirectoryError::RoomNotFound(id.clone()));
        }
        match rooms.get_mut(id) {
            Some(entry) => f(entry),
            None => Err(DirectoryError::RoomNotFound(id.clone())),
        }
    }
}

impl RoomDirectory for MemoryDirectory {
    async fn create(
        &self,
        name: &str,
        capacity: usize,
        options: CreateOptions,
    ) -> Result<Room, DirectoryError> {
        self.check_available()?;
        let CreateOptions {
            is_private,
            creator,
            dedicated,
        } = options;
        let owner = creator.id.clone();
        let members = if dedicated {
            Vec::new()
        } else {
            vec![Participant {
                is_room_owner: true,
                ..creator
            }]
        };
        let room = Room {
            id: RoomId::new(random_hex(6)),
            name: name.to_owned(),
            is_private,
            capacity,
            owner,
            members,
            metadata: BTreeMap::new(),
            last_heartbeat_at: SystemTime::now(),
        };
        lock(&self.state.rooms).insert(
            room.id.clone(),
            RoomEntry {
                room: room.clone(),
                last_seen: Instant::now(),
                heartbeats: 0,
            },
        );
        Ok(room)
    }

    async fn query(&self, options: QueryOptions) -> Result<Vec<Room>, DirectoryError> {
        self.check_available()?;
        let mut rooms = lock(&self.state.rooms);
        let now = Instant::now();
        let ttl = self.state.ttl;
        rooms.retain(|_, entry| now.duration_since(entry.last_seen) <= ttl);
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(rooms
            .values()
            .map(|entry| &entry.room)
            .filter(|room| !room.is_private)
            .filter(|room| options.include_full || !room.is_full())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn join_by_id(&self, id: &RoomId, participant: Participant) -> Result<Room, DirectoryError> {
        self.with_room(id, |entry| {
            let room = &mut entry.room;
            if room.has_member(&participant.id) {
                return Ok(room.clone());
            }
            if room.is_full() {
                return Err(DirectoryError::RoomFull(id.clone()));
            }
            let is_room_owner = room.is_owned_by(&participant.id);
            room.members.push(Participant {
                is_room_owner,
                ..participant
            });
            Ok(room.clone())
        })
    }

    async fn update_metadata(
        &self,
        id: &RoomId,
        metadata: BTreeMap<String, String>,
    ) -> Result<Room, DirectoryError> {
        self.with_room(id, |entry| {
            entry.room.metadata.extend(metadata);
            Ok(entry.room.clone())
        })
    }

    async fn get(&self, id: &RoomId) -> Result<Room, DirectoryError> {
        self.with_room(id, |entry| Ok(entry.room.clone()))
    }

    async fn heartbeat(&self, id: &RoomId) -> Result<(), DirectoryError> {
        self.with_room(id, |entry| {
            entry.last_seen = Instant::now();
            entry.room.last_heartbeat_at = SystemTime::now();
            entry.heartbeats += 1;
            Ok(())
        })
    }

    async fn delete(&self, id: &RoomId) -> Result<(), DirectoryError> {
        self.check_available()?;
        match lock(&self.state.rooms).remove(id) {
            Some(_) => Ok(()),
            None => Err(DirectoryError::RoomNotFound(id.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryRelay
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RelayState {
    allocations: HashMap<String, Allocation>,
    codes: HashMap<JoinCode, String>,
    issued: HashMap<String, JoinCode>,
}

/// Relay allocator held in memory. Codes are six characters from an
/// alphabet without look-alike glyphs (`0`/`O`, `1`/`I`).
#[derive(Debug, Clone)]
pub struct MemoryRelay {
    state: Arc<Mutex<RelayState>>,
    endpoint: Arc<str>,
    unavailable: Arc<AtomicBool>,
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::with_endpoint("127.0.0.1:7777")
    }

    /// Endpoint reported in every issued [`ConnectionParams`].
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState::default())),
            endpoint: Arc::from(endpoint),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// While set, every call fails with [`RelayError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn allocation_count(&self) -> usize {
        lock(&self.state).allocations.len()
    }

    fn check_available(&self) -> Result<(), RelayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RelayError::Unavailable("relay offline".into()));
        }
        Ok(())
    }
}

impl RelayAllocator for MemoryRelay {
    async fn allocate(&self, max_connections: usize, mode: TransportMode) -> Result<Allocation, RelayError> {
        self.check_available()?;
        let id = random_hex(8);
        let allocation = Allocation {
            id: id.clone(),
            max_connections,
            server_params: ConnectionParams {
                endpoint: self.endpoint.to_string(),
                allocation_id: id.clone(),
                key: if mode.is_secure() {
                    random_key()
                } else {
                    Vec::new()
                },
                mode,
            },
        };
        lock(&self.state).allocations.insert(id, allocation.clone());
        Ok(allocation)
    }

    async fn join_code(&self, allocation: &Allocation) -> Result<JoinCode, RelayError> {
        self.check_available()?;
        let mut state = lock(&self.state);
        if !state.allocations.contains_key(&allocation.id) {
            return Err(RelayError::UnknownAllocation(allocation.id.clone()));
        }
        if let Some(code) = state.issued.get(&allocation.id) {
            return Ok(code.clone());
        }
        let code = loop {
            let candidate = JoinCode::parse(&random_join_code())
                .map_err(|e| RelayError::Rejected(e.to_string()))?;
            if !state.codes.contains_key(&candidate) {
                break candidate;
            }
        };
        state.codes.insert(code.clone(), allocation.id.clone());
        state.issued.insert(allocation.id.clone(), code.clone());
        Ok(code)
    }

    async fn resolve_join_code(
        &self,
        code: &JoinCode,
        mode: TransportMode,
    ) -> Result<ConnectionParams, RelayError> {
        self.check_available()?;
        let state = lock(&self.state);
        let allocation = state
            .codes
            .get(code)
            .and_then(|id| state.allocations.get(id))
            .ok_or_else(|| RelayError::UnknownJoinCode(code.clone()))?;
        let expected = allocation.server_params.mode;
        if expected != mode {
            return Err(RelayError::ModeMismatch {
                expected,
                requested: mode,
            });
        }
        Ok(allocation.server_params.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryProfiles
// ---------------------------------------------------------------------------

/// Profile store held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfiles {
    names: Arc<Mutex<HashMap<ParticipantId, String>>>,
}

impl MemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds a saved nickname.
    pub fn insert(&self, id: ParticipantId, name: impl Into<String>) {
        lock(&self.names).insert(id, name.into());
    }
}

impl ProfileStore for MemoryProfiles {
    async fn get_display_name(&self, id: &ParticipantId) -> Result<String, ProfileError> {
        lock(&self.names)
            .get(id)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(id.clone()))
    }

    async fn set_display_name(&self, id: &ParticipantId, name: &str) -> Result<(), ProfileError> {
        lock(&self.names).insert(id.clone(), name.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creator(id: &str) -> CreateOptions {
        CreateOptions {
            is_private: false,
            creator: Participant {
                id: ParticipantId::new(id),
                display_name: id.to_uppercase(),
                is_room_owner: true,
            },
            dedicated: false,
        }
    }

    fn guest(id: &str) -> Participant {
        Participant {
            id: ParticipantId::new(id),
            display_name: id.to_uppercase(),
            is_room_owner: false,
        }
    }

    // =====================================================================
    // MemoryDirectory
    // =====================================================================

    #[tokio::test]
    async fn test_create_lists_creator_as_owner_member() {
        let dir = MemoryDirectory::new();
        let room = dir.create("Alpha", 4, creator("a")).await.unwrap();
        assert_eq!(room.owner, ParticipantId::new("a"));
        assert_eq!(room.members.len(), 1);
        assert!(room.members[0].is_room_owner);
        assert_eq!(room.relay_join_code(), None);
    }

    #[tokio::test]
    async fn test_create_dedicated_has_no_members() {
        let dir = MemoryDirectory::new();
        let mut options = creator("server");
        options.dedicated = true;
        let room = dir.create("Arena", 8, options).await.unwrap();
        assert!(room.members.is_empty());
        assert_eq!(room.owner, ParticipantId::new("server"));
    }

    #[tokio::test]
    async fn test_query_hides_private_rooms() {
        let dir = MemoryDirectory::new();
        dir.create("Public", 4, creator("a")).await.unwrap();
        let mut private = creator("b");
        private.is_private = true;
        let hidden = dir.create("Secret", 4, private).await.unwrap();

        let listed = dir.query(QueryOptions::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Public");
        // Still reachable by id.
        assert!(dir.get(&hidden.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_join_caps_members_at_capacity() {
        let dir = MemoryDirectory::new();
        let room = dir.create("Duo", 2, creator("a")).await.unwrap();
        dir.join_by_id(&room.id, guest("b")).await.unwrap();

        let err = dir.join_by_id(&room.id, guest("c")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::RoomFull(_)));
        assert_eq!(dir.get(&room.id).await.unwrap().members.len(), 2);
    }

    #[tokio::test]
    async fn test_join_twice_is_idempotent() {
        let dir = MemoryDirectory::new();
        let room = dir.create("Alpha", 4, creator("a")).await.unwrap();
        dir.join_by_id(&room.id, guest("b")).await.unwrap();
        let again = dir.join_by_id(&room.id, guest("b")).await.unwrap();
        assert_eq!(again.members.len(), 2);
    }

    #[tokio::test]
    async fn test_query_excludes_full_rooms_by_default() {
        let dir = MemoryDirectory::new();
        let room = dir.create("Duo", 2, creator("a")).await.unwrap();
        dir.join_by_id(&room.id, guest("b")).await.unwrap();

        assert!(dir.query(QueryOptions::default()).await.unwrap().is_empty());
        let all = dir
            .query(QueryOptions {
                include_full: true,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_expires_without_heartbeat() {
        let dir = MemoryDirectory::new();
        let room = dir.create("Alpha", 4, creator("a")).await.unwrap();

        tokio::time::advance(DEFAULT_ROOM_TTL + Duration::from_secs(1)).await;

        assert!(matches!(
            dir.get(&room.id).await,
            Err(DirectoryError::RoomNotFound(_))
        ));
        assert_eq!(dir.room_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_keeps_room_alive() {
        let dir = MemoryDirectory::new();
        let room = dir.create("Alpha", 4, creator("a")).await.unwrap();

        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(15)).await;
            dir.heartbeat(&room.id).await.unwrap();
        }
        assert!(dir.get(&room.id).await.is_ok());
        assert_eq!(dir.heartbeat_count(&room.id), Some(4));
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let dir = MemoryDirectory::new();
        let room = dir.create("Alpha", 4, creator("a")).await.unwrap();
        dir.set_unavailable(true);
        assert!(matches!(
            dir.get(&room.id).await,
            Err(DirectoryError::Unavailable(_))
        ));
        dir.set_unavailable(false);
        assert!(dir.get(&room.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_unknown_room_is_not_found() {
        let dir = MemoryDirectory::new();
        assert!(matches!(
            dir.delete(&RoomId::new("nope")).await,
            Err(DirectoryError::RoomNotFound(_))
        ));
    }

    // =====================================================================
    // MemoryRelay
    // =====================================================================

    #[tokio::test]
    async fn test_join_code_is_stable_per_allocation() {
        let relay = MemoryRelay::new();
        let allocation = relay.allocate(3, TransportMode::Dtls).await.unwrap();
        let first = relay.join_code(&allocation).await.unwrap();
        let second = relay.join_code(&allocation).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), JOIN_CODE_LEN);
    }

    #[tokio::test]
    async fn test_secure_modes_carry_key_material() {
        let relay = MemoryRelay::new();
        let secure = relay.allocate(1, TransportMode::Dtls).await.unwrap();
        let plain = relay.allocate(1, TransportMode::Udp).await.unwrap();
        assert_eq!(secure.server_params.key.len(), 16);
        assert!(plain.server_params.key.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_unknown_code_fails() {
        let relay = MemoryRelay::new();
        let code = JoinCode::parse("ZZZZZZ").unwrap();
        assert!(matches!(
            relay.resolve_join_code(&code, TransportMode::Dtls).await,
            Err(RelayError::UnknownJoinCode(_))
        ));
    }

    // =====================================================================
    // MemoryAuth / MemoryProfiles
    // =====================================================================

    #[tokio::test]
    async fn test_anonymous_sign_in_mints_one_identity() {
        let auth = MemoryAuth::new();
        assert_eq!(auth.current_identity(), None);
        let id = auth.sign_in().await.unwrap();
        assert!(id.as_str().starts_with("p-"));
        assert_eq!(auth.sign_in().await.unwrap(), id);
        assert_eq!(auth.current_identity(), Some(id));
    }

    #[tokio::test]
    async fn test_profiles_not_found_then_saved() {
        let profiles = MemoryProfiles::new();
        let id = ParticipantId::new("p-1");
        assert!(matches!(
            profiles.get_display_name(&id).await,
            Err(ProfileError::NotFound(_))
        ));
        profiles.set_display_name(&id, "Nick1").await.unwrap();
        assert_eq!(profiles.get_display_name(&id).await.unwrap(), "Nick1");
    }
}
