//! State shared between the coordinator and its heartbeat task.

use std::sync::{Mutex, MutexGuard, PoisonError};

use huddle_protocol::{Room, RoomId};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::{Phase, SessionEvent};

pub(crate) struct Shared {
    phase: watch::Sender<Phase>,
    room: Mutex<Option<Room>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    pub(crate) fn new(event_capacity: usize) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            phase,
            room: Mutex::new(None),
            events,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub(crate) fn phase_receiver(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub(crate) fn set_phase(&self, next: Phase) {
        let prev = self.phase.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "session phase changed");
        }
    }

    /// Moves `from` to `to` only if the phase is still `from`.
    pub(crate) fn transition(&self, from: Phase, to: Phase) -> bool {
        self.phase.send_if_modified(|phase| {
            if *phase == from {
                *phase = to;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Sends to current subscribers. Having none is fine.
    pub(crate) fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn room_slot(&self) -> MutexGuard<'_, Option<Room>> {
        self.room.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn room(&self) -> Option<Room> {
        self.room_slot().clone()
    }

    pub(crate) fn set_room(&self, room: Room) {
        *self.room_slot() = Some(room);
    }

    pub(crate) fn take_room(&self) -> Option<Room> {
        self.room_slot().take()
    }

    /// Replaces the snapshot if it still describes the same room.
    pub(crate) fn refresh_room(&self, room: &Room) -> bool {
        let mut slot = self.room_slot();
        match slot.as_mut() {
            Some(current) if current.id == room.id => {
                *current = room.clone();
                true
            }
            _ => false,
        }
    }

    /// Clears the snapshot if it describes `id`.
    pub(crate) fn take_room_if(&self, id: &RoomId) -> Option<Room> {
        let mut slot = self.room_slot();
        if slot.as_ref().is_some_and(|room| &room.id == id) {
            slot.take()
        } else {
            None
        }
    }
}
