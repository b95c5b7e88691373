//! Live broadcast channel: sessions grouped into rooms keyed by active date.
//!
//! Each connected session owns an unbounded receiver; the hub keeps the sending
//! half. Publishing snapshots the target senders under the lock and delivers
//! after releasing it, so a slow consumer never holds up the hub.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::util::serde::{SessionId, SlotId};

/// Server-initiated events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Free seats of a slot changed on the given active date.
    #[serde(rename_all = "camelCase")]
    OccupancyChanged {
        /// Room the event was published to.
        active_date: String,
        /// Affected slot.
        slot_id: SlotId,
        /// Bucket A seats left.
        free_a: u32,
        /// Bucket B seats left.
        free_b: u32,
    },
    /// The active day moved forward; clients should rejoin and refetch.
    #[serde(rename_all = "camelCase")]
    DayRolledOver {
        /// The date now open for booking.
        new_active_date: String,
    },
}

struct SessionEntry {
    sender: mpsc::UnboundedSender<ServerEvent>,
    room: Option<String>,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<SessionId, SessionEntry>,
    rooms: HashMap<String, HashSet<SessionId>>,
}

impl HubState {
    fn leave_room(&mut self, session: SessionId, room: &str) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&session);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }
}

/// Room registry and fan-out.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    inner: Arc<Mutex<HubState>>,
}

impl BroadcastHub {
    /// Empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and hand back its event stream.
    pub fn connect(&self, session: SessionId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.inner.lock();
        if let Some(previous) = state.sessions.insert(session, SessionEntry { sender, room: None }) {
            if let Some(room) = previous.room {
                state.leave_room(session, &room);
            }
        }
        receiver
    }

    /// Forget a session and its room membership.
    pub fn disconnect(&self, session: SessionId) {
        let mut state = self.inner.lock();
        if let Some(entry) = state.sessions.remove(&session) {
            if let Some(room) = entry.room {
                state.leave_room(session, &room);
            }
        }
    }

    /// Move a session into `room`, leaving any previous room. Unknown sessions are ignored.
    pub fn join(&self, session: SessionId, room: &str) -> bool {
        let mut state = self.inner.lock();
        let previous = match state.sessions.get_mut(&session) {
            Some(entry) => entry.room.replace(room.to_string()),
            None => return false,
        };
        if let Some(previous) = previous {
            state.leave_room(session, &previous);
        }
        state.rooms.entry(room.to_string()).or_default().insert(session);
        tracing::debug!(%session, room, "session joined room");
        true
    }

    /// Room the session currently belongs to.
    pub fn room_of(&self, session: SessionId) -> Option<String> {
        self.inner
            .lock()
            .sessions
            .get(&session)
            .and_then(|entry| entry.room.clone())
    }

    /// Members of `room`.
    pub fn room_size(&self, room: &str) -> usize {
        self.inner.lock().rooms.get(room).map_or(0, HashSet::len)
    }

    /// Connected sessions.
    pub fn session_count(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    /// Deliver `event` to every session in `room`. Returns how many received it.
    pub fn publish_to_room(&self, room: &str, event: &ServerEvent) -> usize {
        let targets: Vec<(SessionId, mpsc::UnboundedSender<ServerEvent>)> = {
            let state = self.inner.lock();
            state
                .rooms
                .get(room)
                .into_iter()
                .flatten()
                .filter_map(|id| state.sessions.get(id).map(|e| (*id, e.sender.clone())))
                .collect()
        };
        self.deliver(targets, event)
    }

    /// Deliver `event` to every connected session regardless of room.
    pub fn publish_all(&self, event: &ServerEvent) -> usize {
        let targets: Vec<(SessionId, mpsc::UnboundedSender<ServerEvent>)> = self
            .inner
            .lock()
            .sessions
            .iter()
            .map(|(id, e)| (*id, e.sender.clone()))
            .collect();
        self.deliver(targets, event)
    }

    fn deliver(
        &self,
        targets: Vec<(SessionId, mpsc::UnboundedSender<ServerEvent>)>,
        event: &ServerEvent,
    ) -> usize {
        let mut delivered = 0;
        for (session, sender) in targets {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(%session, "dropping closed session");
                self.disconnect(session);
            }
        }
        delivered
    }
}
