use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type ConnectionId = u64;

/// Server-to-client frame: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushMessage {
    pub event: String,
    pub data: Value,
}

impl PushMessage {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Room every client watching a task joins.
pub fn task_room(task_id: Uuid) -> String {
    format!("task:{}", task_id)
}

struct Connection {
    user_id: Uuid,
    tx: mpsc::UnboundedSender<PushMessage>,
    rooms: HashSet<String>,
}

/// Registry of live WebSocket connections, by user and by room.
///
/// A user may hold several connections at once; each receives its own copy of a push.
#[derive(Default)]
pub struct NotificationHub {
    next_id: AtomicU64,
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        user_id: Uuid,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<PushMessage>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Connection {
                    user_id,
                    tx,
                    rooms: HashSet::new(),
                },
            );
        log::debug!("socket {} connected for user {}", id, user_id);
        (id, rx)
    }

    pub fn unregister(&self, id: ConnectionId) {
        let removed = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(conn) = removed {
            log::debug!("socket {} for user {} disconnected", id, conn.user_id);
        }
    }

    pub fn join(&self, id: ConnectionId, room: String) {
        if let Some(conn) = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&id)
        {
            conn.rooms.insert(room);
        }
    }

    pub fn leave(&self, id: ConnectionId, room: &str) {
        if let Some(conn) = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&id)
        {
            conn.rooms.remove(room);
        }
    }

    /// Pushes to every connection of `user_id`; returns how many received it.
    pub fn notify_user(&self, user_id: Uuid, message: &PushMessage) -> usize {
        self.broadcast(|conn| conn.user_id == user_id, message)
    }

    /// Pushes to every connection that joined `room`; returns how many received it.
    pub fn emit_to_room(&self, room: &str, message: &PushMessage) -> usize {
        self.broadcast(|conn| conn.rooms.contains(room), message)
    }

    pub fn connection_count(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn broadcast(&self, matches: impl Fn(&Connection) -> bool, message: &PushMessage) -> usize {
        let connections = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        connections
            .values()
            .filter(|conn| matches(conn))
            .filter(|conn| conn.tx.send(message.clone()).is_ok())
            .count()
    }
}
