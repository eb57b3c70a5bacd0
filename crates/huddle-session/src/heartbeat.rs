//! The room heartbeat loop.
//!
//! While a participant is in a room, one background task keeps the
//! directory record fresh: the owner pings it, everyone re-reads it, and
//! a room the directory no longer knows tears the local session down.

use std::sync::Arc;
use std::time::Duration;

use huddle_protocol::RoomId;
use huddle_services::{DirectoryError, RoomDirectory, RoomDirectoryClient};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::Shared;
use crate::error::HeartbeatExit;
use crate::{Phase, SessionEvent};

/// Handle to a running loop. Dropping it does not stop the loop; call
/// [`stop`](Self::stop).
pub(crate) struct HeartbeatHandle {
    cancel: CancellationToken,
    task: JoinHandle<HeartbeatExit>,
}

impl HeartbeatHandle {
    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub(crate) fn stop(self) {
        self.cancel.cancel();
        // The task observes the token at its next await point.
        drop(self.task);
    }
}

pub(crate) struct HeartbeatLoop<D> {
    pub(crate) directory: RoomDirectoryClient<D>,
    pub(crate) room_id: RoomId,
    pub(crate) is_owner: bool,
    pub(crate) interval: Duration,
    pub(crate) shared: Arc<Shared>,
}

impl<D: RoomDirectory> HeartbeatLoop<D> {
    pub(crate) fn spawn(self) -> HeartbeatHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        HeartbeatHandle { cancel, task }
    }

    /// Runs until cancelled or until the room disappears.
    ///
    /// The first tick fires immediately. Cancellation is checked before
    /// each directory call and races every await, with priority.
    async fn run(self, cancel: CancellationToken) -> HeartbeatExit {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(room = %self.room_id, owner = self.is_owner, "heartbeat started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(),
                _ = ticker.tick() => {}
            }

            if self.is_owner {
                if cancel.is_cancelled() {
                    return self.cancelled();
                }
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return self.cancelled(),
                    res = self.directory.heartbeat(&self.room_id) => res,
                };
                match sent {
                    Ok(()) => {}
                    Err(DirectoryError::RoomNotFound(_)) => return self.room_closed(&cancel),
                    Err(e) => warn!(room = %self.room_id, error = %e, "room heartbeat failed"),
                }
            }

            if cancel.is_cancelled() {
                return self.cancelled();
            }
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(),
                res = self.directory.get(&self.room_id) => res,
            };
            match fetched {
                Ok(room) => {
                    if self.shared.refresh_room(&room) {
                        self.shared.publish(SessionEvent::RoomUpdated(room));
                    }
                }
                Err(DirectoryError::RoomNotFound(_)) => return self.room_closed(&cancel),
                Err(e) => warn!(room = %self.room_id, error = %e, "room refresh failed"),
            }
        }
    }

    fn cancelled(&self) -> HeartbeatExit {
        debug!(room = %self.room_id, "heartbeat cancelled");
        HeartbeatExit::Cancelled
    }

    fn room_closed(&self, cancel: &CancellationToken) -> HeartbeatExit {
        // A leave that raced the failing call has already cleaned up.
        if cancel.is_cancelled() {
            return self.cancelled();
        }
        if self.shared.take_room_if(&self.room_id).is_some() {
            self.shared.set_phase(Phase::Idle);
            self.shared.publish(SessionEvent::RoomClosed {
                room_id: self.room_id.clone(),
            });
        }
        info!(room = %self.room_id, "room closed by directory");
        HeartbeatExit::RoomClosed
    }
}
