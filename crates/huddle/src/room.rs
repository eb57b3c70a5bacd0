//! Room actor: the single writer for one room's chat and gate.
//!
//! Connection handlers never touch the [`EventRouter`] or the
//! [`CoordinatedGate`] directly. They send commands over an mpsc channel
//! and the actor applies them one at a time, so sequence numbers follow
//! the order in which submissions were accepted.

use std::collections::BTreeMap;

use huddle_chat::EventRouter;
use huddle_gate::{Actuation, CoordinatedGate};
use huddle_protocol::{ActuatorId, ConnectionId, Dispatch, ParticipantId, Recipient, ServerMessage};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::{HostConfig, RoomError};

/// Outbound queue of one connection. The connection's writer task drains it.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

pub(crate) enum RoomCommand {
    Register {
        connection: ConnectionId,
        display_name: String,
        identity: Option<ParticipantId>,
        outbox: Outbox,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Broadcast {
        connection: ConnectionId,
        body: String,
        reply: oneshot::Sender<Result<u64, RoomError>>,
    },
    Directed {
        connection: ConnectionId,
        target: String,
        body: String,
        reply: oneshot::Sender<Result<u64, RoomError>>,
    },
    Actuate {
        connection: ConnectionId,
        actuator: ActuatorId,
        reply: oneshot::Sender<Result<Actuation, RoomError>>,
    },
    Detach {
        connection: ConnectionId,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// Snapshot of the room's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    /// Registered connections.
    pub participants: usize,
    /// Sequence number of the last emitted chat event, 0 if none.
    pub last_sequence: u64,
    pub gate_open: bool,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Cheap-to-clone handle to a running room actor.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
    gate: watch::Receiver<bool>,
}

impl RoomHandle {
    /// Registers `connection` and attaches its outbox.
    ///
    /// On success the connection first receives `Welcome`, then the room
    /// (including itself) receives the "joined" notice.
    pub async fn register(
        &self,
        connection: ConnectionId,
        display_name: impl Into<String>,
        identity: Option<ParticipantId>,
        outbox: Outbox,
    ) -> Result<(), RoomError> {
        let display_name = display_name.into();
        self.request(|reply| RoomCommand::Register {
            connection,
            display_name,
            identity,
            outbox,
            reply,
        })
        .await?
    }

    /// Submits a public line. Returns its sequence number.
    pub async fn broadcast(
        &self,
        connection: ConnectionId,
        body: impl Into<String>,
    ) -> Result<u64, RoomError> {
        let body = body.into();
        self.request(|reply| RoomCommand::Broadcast {
            connection,
            body,
            reply,
        })
        .await?
    }

    /// Submits a private line. Returns the sequence number of the line, or
    /// of the not-found notice sent back to the sender.
    pub async fn directed(
        &self,
        connection: ConnectionId,
        target: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<u64, RoomError> {
        let target = target.into();
        let body = body.into();
        self.request(|reply| RoomCommand::Directed {
            connection,
            target,
            body,
            reply,
        })
        .await?
    }

    /// Presses one gate switch on behalf of `connection`.
    pub async fn actuate(
        &self,
        connection: ConnectionId,
        actuator: ActuatorId,
    ) -> Result<Actuation, RoomError> {
        self.request(|reply| RoomCommand::Actuate {
            connection,
            actuator,
            reply,
        })
        .await?
    }

    /// Removes `connection`. Unknown connections are ignored.
    pub async fn detach(&self, connection: ConnectionId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Detach { connection })
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    /// Stops the actor. Queued commands ahead of this one still run.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    /// Latched gate state; late subscribers read the current value.
    pub fn gate(&self) -> watch::Receiver<bool> {
        self.gate.clone()
    }

    pub fn is_gate_open(&self) -> bool {
        *self.gate.borrow()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable)?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

struct RoomActor {
    router: EventRouter,
    gate: CoordinatedGate,
    outboxes: BTreeMap<ConnectionId, Outbox>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// When the gate last had time charged to it.
    last_tick: Instant,
}

impl RoomActor {
    async fn run(mut self, tick_every: std::time::Duration) {
        info!("room actor started");
        let mut ticker = tokio::time::interval(tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                now = ticker.tick() => self.advance_gate(now),
            }
        }

        info!(participants = self.router.len(), "room actor stopped");
    }

    /// Applies one command. Returns `false` on shutdown.
    fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Register {
                connection,
                display_name,
                identity,
                outbox,
                reply,
            } => {
                let result = self.register(connection, &display_name, identity, outbox);
                let _ = reply.send(result);
            }
            RoomCommand::Broadcast {
                connection,
                body,
                reply,
            } => {
                let result = self.broadcast(connection, &body);
                let _ = reply.send(result);
            }
            RoomCommand::Directed {
                connection,
                target,
                body,
                reply,
            } => {
                let result = self.directed(connection, &target, &body);
                let _ = reply.send(result);
            }
            RoomCommand::Actuate {
                connection,
                actuator,
                reply,
            } => {
                let result = self.actuate(connection, &actuator);
                let _ = reply.send(result);
            }
            RoomCommand::Detach { connection } => self.detach(connection),
            RoomCommand::Info { reply } => {
                let _ = reply.send(RoomInfo {
                    participants: self.router.len(),
                    last_sequence: self.router.last_sequence(),
                    gate_open: self.gate.is_open(),
                });
            }
            RoomCommand::Shutdown => {
                info!("room shutting down");
                return false;
            }
        }
        true
    }

    fn register(
        &mut self,
        connection: ConnectionId,
        display_name: &str,
        identity: Option<ParticipantId>,
        outbox: Outbox,
    ) -> Result<(), RoomError> {
        let joined = self.router.register(connection, display_name, identity)?;
        let _ = outbox.send(ServerMessage::Welcome {
            connection,
            gate_open: self.gate.is_open(),
        });
        self.outboxes.insert(connection, outbox);
        if let Some(dispatch) = joined {
            self.deliver(dispatch);
        }
        Ok(())
    }

    fn broadcast(&mut self, connection: ConnectionId, body: &str) -> Result<u64, RoomError> {
        self.require_registered(connection)?;
        let dispatch = self.router.submit_broadcast(connection, body)?;
        Ok(self.deliver(dispatch))
    }

    fn directed(
        &mut self,
        connection: ConnectionId,
        target: &str,
        body: &str,
    ) -> Result<u64, RoomError> {
        self.require_registered(connection)?;
        let dispatch = self.router.submit_directed(connection, target, body)?;
        Ok(self.deliver(dispatch))
    }

    fn actuate(
        &mut self,
        connection: ConnectionId,
        actuator: &ActuatorId,
    ) -> Result<Actuation, RoomError> {
        self.require_registered(connection)?;
        // Settle time owed since the last tick before arming a new timer.
        self.advance_gate(Instant::now());
        let outcome = self.gate.actuate(actuator)?;
        if outcome == Actuation::Opened {
            info!(%connection, %actuator, "gate opened, notifying room");
            for outbox in self.outboxes.values() {
                let _ = outbox.send(ServerMessage::GateOpened);
            }
        }
        Ok(outcome)
    }

    fn advance_gate(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if !elapsed.is_zero() {
            self.gate.tick(elapsed);
        }
        self.last_tick = self.last_tick.max(now);
    }

    fn detach(&mut self, connection: ConnectionId) {
        let had_outbox = self.outboxes.remove(&connection).is_some();
        if let Some(dispatch) = self.router.unregister(connection) {
            self.deliver(dispatch);
        } else if had_outbox {
            debug!(%connection, "detached connection had no registration");
        }
    }

    fn require_registered(&self, connection: ConnectionId) -> Result<(), RoomError> {
        if self.outboxes.contains_key(&connection) && self.router.is_registered(connection) {
            Ok(())
        } else {
            Err(RoomError::NotRegistered(connection))
        }
    }

    /// Routes an event to its recipients. Returns the event's sequence.
    ///
    /// A closed outbox means the connection is going away; its detach
    /// command is already on the way.
    fn deliver(&self, dispatch: Dispatch) -> u64 {
        let sequence = dispatch.event.sequence;
        match &dispatch.recipient {
            Recipient::All => {
                for outbox in self.outboxes.values() {
                    let _ = outbox.send(ServerMessage::Chat {
                        event: dispatch.event.clone(),
                    });
                }
            }
            Recipient::Only(connections) => {
                for connection in connections {
                    if let Some(outbox) = self.outboxes.get(connection) {
                        let _ = outbox.send(ServerMessage::Chat {
                            event: dispatch.event.clone(),
                        });
                    }
                }
            }
        }
        debug!(sequence, "chat event delivered");
        sequence
    }
}

/// Spawns a room actor with the router and gate described by `config`.
pub fn spawn_room(config: &HostConfig) -> RoomHandle {
    let (sender, receiver) = mpsc::channel(config.command_buffer.max(1));
    let gate = CoordinatedGate::new(config.gate.clone());
    let handle = RoomHandle {
        sender,
        gate: gate.subscribe(),
    };
    let actor = RoomActor {
        router: EventRouter::new(config.router.clone()),
        gate,
        outboxes: BTreeMap::new(),
        receiver,
        last_tick: Instant::now(),
    };
    tokio::spawn(actor.run(config.tick_interval()));
    handle
}
