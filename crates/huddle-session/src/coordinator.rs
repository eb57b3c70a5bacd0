//! The session coordinator: one participant's path into and out of a room.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use huddle_protocol::{ConnectionParams, ParticipantId, RelaySession, Room, RoomId};
use huddle_services::{
    AuthProvider, CreateOptions, DirectoryError, IdentitySession, QueryOptions, RelayAllocator,
    RelayBroker, RoomDirectory, RoomDirectoryClient,
};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::heartbeat::{HeartbeatHandle, HeartbeatLoop};
use crate::state::Shared;
use crate::{Phase, SessionConfig, SessionError, SessionEvent, TransportRole};

/// What to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRequest {
    pub name: String,
    pub is_private: bool,
    /// Total slots, host included.
    pub capacity: usize,
    /// Create for a dedicated server: this process owns the room without
    /// taking a member slot and hands off as [`TransportRole::Server`].
    pub dedicated: bool,
}

impl RoomRequest {
    /// A public, player-hosted room.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            is_private: false,
            capacity,
            dedicated: false,
        }
    }
}

/// Result of [`SessionCoordinator::create_room`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRoom {
    /// Snapshot after the join code was published.
    pub room: Room,
    pub relay: RelaySession,
    pub role: TransportRole,
}

/// Result of [`SessionCoordinator::join_room`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    pub room: Room,
    /// Client-side relay parameters resolved from the room's join code.
    pub params: ConnectionParams,
}

/// Drives the lobby lifecycle for the local participant.
///
/// Creating a room runs directory create, relay allocation, join-code
/// issue and metadata publish, in that order, and only then reports the
/// room as joinable. Joining checks the published code before touching
/// the relay. While in a room, a background heartbeat keeps the
/// directory record alive and republishes fresh snapshots.
///
/// State changes are announced on [`subscribe`](Self::subscribe); the
/// coordinator never retries a failed call by itself.
pub struct SessionCoordinator<A, D, R> {
    identity: IdentitySession<A>,
    directory: RoomDirectoryClient<D>,
    relay: RelayBroker<R>,
    config: SessionConfig,
    shared: Arc<Shared>,
    heartbeat: Mutex<Option<HeartbeatHandle>>,
}

impl<A, D, R> SessionCoordinator<A, D, R>
where
    A: AuthProvider,
    D: RoomDirectory,
    R: RelayAllocator,
{
    pub fn new(identity: IdentitySession<A>, directory: D, relay: R, config: SessionConfig) -> Self {
        let config = config.validated();
        Self {
            identity,
            directory: RoomDirectoryClient::new(directory),
            relay: RelayBroker::new(relay, config.transport_mode),
            shared: Arc::new(Shared::new(config.event_capacity)),
            config,
            heartbeat: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn identity(&self) -> &IdentitySession<A> {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut IdentitySession<A> {
        &mut self.identity
    }

    /// Signs the local participant in if needed.
    pub async fn sign_in(&mut self) -> Result<ParticipantId, SessionError> {
        Ok(self.identity.sign_in().await?)
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase()
    }

    /// Watch channel over the phase, for callers that want to react to
    /// transitions.
    pub fn phase_receiver(&self) -> watch::Receiver<Phase> {
        self.shared.phase_receiver()
    }

    /// Snapshot of the current room, if any.
    pub fn room(&self) -> Option<Room> {
        self.shared.room()
    }

    /// Stream of [`SessionEvent`]s. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.subscribe()
    }

    /// Whether a heartbeat loop is alive.
    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Creates a room, allocates relay capacity and publishes the join code.
    ///
    /// On any failure the partially created room is deleted (best effort),
    /// the phase returns to `Idle`, and the error is returned.
    ///
    /// # Errors
    /// - [`SessionError::InvalidState`] unless `Idle`.
    /// - [`SessionError::Auth`] if not signed in.
    /// - [`SessionError::InvalidInput`] for a bad name or capacity.
    /// - [`SessionError::Directory`] / [`SessionError::Relay`] from the
    ///   services.
    pub async fn create_room(&mut self, request: RoomRequest) -> Result<CreatedRoom, SessionError> {
        self.require_phase(Phase::Idle, "create a room")?;
        let creator = self.identity.participant(true)?;
        let role = if request.dedicated {
            TransportRole::Server
        } else {
            TransportRole::Host
        };

        self.shared.set_phase(Phase::CreatingOrJoining);
        let options = CreateOptions {
            is_private: request.is_private,
            creator,
            dedicated: request.dedicated,
        };
        let room = match self
            .directory
            .create(&request.name, request.capacity, options)
            .await
        {
            Ok(room) => room,
            Err(e) => return Err(self.fail(e.into())),
        };

        let (room, relay) = match self.allocate_and_publish(&room).await {
            Ok(done) => done,
            Err(e) => {
                if let Err(cleanup) = self.directory.delete(&room.id).await {
                    warn!(room = %room.id, error = %cleanup, "could not delete half-created room");
                }
                return Err(self.fail(e));
            }
        };

        self.enter_room(room.clone(), true);
        self.shared.publish(SessionEvent::TransportReady {
            role,
            params: relay.server_params.clone(),
        });
        info!(room = %room.id, code = %relay.join_code, ?role, "room ready");
        Ok(CreatedRoom { room, relay, role })
    }

    /// Lists joinable public rooms: not full, with a published join code.
    pub async fn query_rooms(&self) -> Result<Vec<Room>, SessionError> {
        if self.phase() == Phase::Closed {
            return Err(SessionError::InvalidState("coordinator is closed".into()));
        }
        let rooms = self.directory.query(QueryOptions::default()).await?;
        Ok(rooms.into_iter().filter(Room::is_joinable).collect())
    }

    /// Joins `room_id` and resolves its relay join code.
    ///
    /// # Errors
    /// - [`SessionError::NotReady`] if the owner has not published a join
    ///   code yet (retryable).
    /// - [`SessionError::RoomNotFound`], [`SessionError::Directory`],
    ///   [`SessionError::Relay`] from the services.
    pub async fn join_room(&mut self, room_id: &RoomId) -> Result<JoinedRoom, SessionError> {
        self.require_phase(Phase::Idle, "join a room")?;
        let me = self.identity.participant(false)?;
        let my_id = me.id.clone();

        self.shared.set_phase(Phase::CreatingOrJoining);
        let room = match self.directory.join_by_id(room_id, me).await {
            Ok(room) => room,
            Err(e) => return Err(self.fail(e.into())),
        };

        let Some(code) = room.relay_join_code() else {
            info!(room = %room_id, "room has no join code yet");
            return Err(self.fail(SessionError::NotReady(room_id.clone())));
        };
        let params = match self.relay.resolve(code).await {
            Ok(params) => params,
            Err(e) => return Err(self.fail(e.into())),
        };

        let is_owner = room.is_owned_by(&my_id);
        self.enter_room(room.clone(), is_owner);
        self.shared.publish(SessionEvent::TransportReady {
            role: TransportRole::Client,
            params: params.clone(),
        });
        Ok(JoinedRoom { room, params })
    }

    /// Waits until the coordinator holds a room, or `timeout` elapses.
    pub async fn wait_until_in_room(&self, timeout: Duration) -> Result<Room, SessionError> {
        let mut phases = self.shared.phase_receiver();
        let waited = tokio::time::timeout(
            timeout,
            phases.wait_for(|phase| phase.is_in_room() || *phase == Phase::Closed),
        )
        .await;
        match waited {
            Ok(Ok(phase)) if *phase == Phase::Closed => {
                Err(SessionError::InvalidState("coordinator is closed".into()))
            }
            Ok(Ok(_)) => self
                .shared
                .room()
                .ok_or_else(|| SessionError::InvalidState("room was cleared".into())),
            Ok(Err(_)) => Err(SessionError::InvalidState("coordinator is closed".into())),
            Err(_) => Err(SessionError::Timeout(timeout)),
        }
    }

    /// Stops the heartbeat loop. Idempotent; fine to call with no loop.
    pub fn stop_heartbeat(&self) {
        stop_loop(&self.heartbeat, &self.shared);
    }

    /// Leaves the current room locally. Makes no directory calls.
    ///
    /// Leaving while `Idle` does nothing.
    pub fn leave(&mut self) -> Result<(), SessionError> {
        match self.phase() {
            Phase::Closed => return Err(SessionError::InvalidState("coordinator is closed".into())),
            Phase::Idle => return Ok(()),
            _ => {}
        }
        self.stop_heartbeat();
        self.shared.set_phase(Phase::Leaving);
        let left = self.shared.take_room();
        self.shared.set_phase(Phase::Idle);
        if let Some(room) = left {
            info!(room = %room.id, "left room");
            self.shared.publish(SessionEvent::Left { room_id: room.id });
        }
        Ok(())
    }

    /// Deletes the room from the directory, then leaves. Owner only.
    ///
    /// A room the directory already forgot still counts as closed.
    pub async fn close_room(&mut self) -> Result<(), SessionError> {
        let room = self
            .shared
            .room()
            .ok_or_else(|| SessionError::InvalidState("not in a room".into()))?;
        let me = self.identity.require_participant_id()?;
        if !room.is_owned_by(me) {
            return Err(SessionError::InvalidState(
                "only the room owner can close the room".into(),
            ));
        }
        self.stop_heartbeat();
        match self.directory.delete(&room.id).await {
            Ok(()) | Err(DirectoryError::RoomNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.leave()
    }

    /// Stops everything and moves to the terminal `Closed` phase.
    pub fn shutdown(&mut self) {
        self.stop_heartbeat();
        self.shared.take_room();
        self.shared.set_phase(Phase::Closed);
        info!("session coordinator shut down");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require_phase(&self, expected: Phase, action: &str) -> Result<(), SessionError> {
        let actual = self.phase();
        if actual != expected {
            return Err(SessionError::InvalidState(format!(
                "cannot {action} while {actual}"
            )));
        }
        Ok(())
    }

    /// Back to `Idle` after a failed create or join.
    fn fail(&self, err: SessionError) -> SessionError {
        self.shared.set_phase(Phase::Idle);
        warn!(error = %err, "room setup failed");
        err
    }

    async fn allocate_and_publish(&self, room: &Room) -> Result<(Room, RelaySession), SessionError> {
        let relay = self.relay.host_session(room.capacity).await?;
        let room = self
            .directory
            .publish_join_code(&room.id, &relay.join_code)
            .await?;
        Ok((room, relay))
    }

    fn enter_room(&self, room: Room, is_owner: bool) {
        let room_id = room.id.clone();
        self.shared.set_room(room);
        self.shared.set_phase(Phase::InRoom);
        self.start_heartbeat(room_id, is_owner);
    }

    /// Stop-then-spawn: at most one loop per coordinator.
    fn start_heartbeat(&self, room_id: RoomId, is_owner: bool) {
        let mut slot = self.heartbeat_slot();
        if let Some(previous) = slot.take() {
            previous.stop();
        }
        *slot = Some(
            HeartbeatLoop {
                directory: self.directory.clone(),
                room_id,
                is_owner,
                interval: self.config.heartbeat_interval,
                shared: Arc::clone(&self.shared),
            }
            .spawn(),
        );
        self.shared.transition(Phase::InRoom, Phase::Heartbeating);
    }

    fn heartbeat_slot(&self) -> MutexGuard<'_, Option<HeartbeatHandle>> {
        self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn stop_loop(slot: &Mutex<Option<HeartbeatHandle>>, shared: &Shared) {
    let handle = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(handle) = handle {
        handle.stop();
        shared.transition(Phase::Heartbeating, Phase::InRoom);
    }
}

impl<A, D, R> Drop for SessionCoordinator<A, D, R> {
    fn drop(&mut self) {
        stop_loop(&self.heartbeat, &self.shared);
        self.shared.set_phase(Phase::Closed);
    }
}
