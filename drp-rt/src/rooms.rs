//! Room-subscription state for the realtime relay
//!
//! All state is in memory and rebuilt from scratch on process restart: a
//! connection belongs to zero or more rooms, membership dies with the
//! connection, and nothing is queued for members who are offline at
//! broadcast time.
//!
//! A single mutex guards both maps so membership mutation and multicast for
//! a room never interleave inconsistently; critical sections only enqueue
//! onto per-connection channels, so holding the lock across a multicast is
//! cheap and never blocks on socket I/O.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outbound frame queue handle for one connection
pub type ConnectionTx = mpsc::UnboundedSender<String>;

#[derive(Default)]
struct RoomsInner {
    /// Connection id -> outbound channel
    connections: HashMap<Uuid, ConnectionTx>,
    /// Room name -> member connection ids
    rooms: HashMap<String, HashSet<Uuid>>,
}

/// Shared room-membership map
#[derive(Clone, Default)]
pub struct Rooms {
    inner: Arc<Mutex<RoomsInner>>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and announce the updated online count to
    /// every connection (including the new one)
    pub fn connect(&self, tx: ConnectionTx) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().expect("rooms lock poisoned");
        inner.connections.insert(id, tx);
        let online = inner.connections.len();
        info!(connection = %id, online, "Client connected");
        broadcast_online(&inner);
        id
    }

    /// Remove a connection, implicitly leaving every room it joined, and
    /// announce the updated online count
    pub fn disconnect(&self, id: Uuid) {
        let mut inner = self.inner.lock().expect("rooms lock poisoned");
        if inner.connections.remove(&id).is_none() {
            return;
        }
        inner.rooms.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
        let online = inner.connections.len();
        info!(connection = %id, online, "Client disconnected");
        broadcast_online(&inner);
    }

    /// Join a room; unknown connections are ignored
    pub fn join(&self, id: Uuid, room: &str) {
        let mut inner = self.inner.lock().expect("rooms lock poisoned");
        if !inner.connections.contains_key(&id) {
            warn!(connection = %id, room = %room, "Join from unknown connection ignored");
            return;
        }
        inner.rooms.entry(room.to_string()).or_default().insert(id);
        info!(connection = %id, room = %room, "Client joined room");
    }

    /// Leave a room; no error if the connection was not a member
    pub fn leave(&self, id: Uuid, room: &str) {
        let mut inner = self.inner.lock().expect("rooms lock poisoned");
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                inner.rooms.remove(room);
            }
        }
        info!(connection = %id, room = %room, "Client left room");
    }

    /// Multicast an event to every current member of `room`.
    ///
    /// Fire-and-forget, at-most-once per currently-connected member: a room
    /// with zero members is a no-op, and members whose channel is closed are
    /// pruned rather than retried. Returns the number of deliveries.
    pub fn emit(&self, event: &str, room: &str, data: &Value) -> usize {
        let frame = envelope(event, data);

        let mut inner = self.inner.lock().expect("rooms lock poisoned");
        let members: Vec<Uuid> = inner
            .rooms
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for id in members {
            match inner.connections.get(&id) {
                Some(tx) if tx.send(frame.clone()).is_ok() => delivered += 1,
                _ => dead.push(id),
            }
        }

        for id in dead {
            inner.connections.remove(&id);
            inner.rooms.retain(|_, members| {
                members.remove(&id);
                !members.is_empty()
            });
        }

        debug!(event = %event, room = %room, delivered, "Multicast event");
        delivered
    }

    /// Number of currently connected clients
    pub fn online_count(&self) -> usize {
        self.inner.lock().expect("rooms lock poisoned").connections.len()
    }
}

/// Push the online count to every connection; send failures are left for
/// the next disconnect to clean up
fn broadcast_online(inner: &RoomsInner) {
    let frame = envelope(
        drp_common::events::ONLINE_USERS,
        &Value::from(inner.connections.len()),
    );
    for tx in inner.connections.values() {
        let _ = tx.send(frame.clone());
    }
}

/// Wire envelope pushed to clients
fn envelope(event: &str, data: &Value) -> String {
    serde_json::json!({ "event": event, "data": data }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_event_and_data() {
        let frame = envelope("resources_updated", &serde_json::json!({"id": 42}));
        let parsed: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["event"], "resources_updated");
        assert_eq!(parsed["data"]["id"], 42);
    }
}
