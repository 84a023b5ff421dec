use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use alumni_types::events::RelayEvent;

/// Live room membership for one relay instance.
///
/// Connections and rooms sit behind a single lock so that a join and a
/// broadcast enumeration are strictly ordered against each other.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    inner: Arc<RwLock<Membership>>,
}

#[derive(Default)]
struct Membership {
    /// conn_id -> outbound channel
    connections: HashMap<Uuid, mpsc::UnboundedSender<RelayEvent>>,

    /// room -> conn_ids
    rooms: HashMap<String, HashSet<Uuid>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Returns (conn_id, receiver).
    pub async fn connect(&self) -> (Uuid, mpsc::UnboundedReceiver<RelayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().await.connections.insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Add a connection to a room. Returns false if the connection is unknown.
    /// Joining a room twice is a no-op.
    pub async fn join(&self, conn_id: Uuid, room: &str) -> bool {
        let mut membership = self.inner.write().await;
        if !membership.connections.contains_key(&conn_id) {
            return false;
        }
        membership
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn_id);
        true
    }

    /// Drop a connection and all of its room memberships.
    pub async fn disconnect(&self, conn_id: Uuid) {
        let mut membership = self.inner.write().await;
        membership.connections.remove(&conn_id);
        membership.rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Deliver an event to every member of `room`. Returns how many
    /// connections it was handed to.
    pub async fn broadcast(&self, room: &str, event: &RelayEvent) -> usize {
        let membership = self.inner.read().await;
        let Some(members) = membership.rooms.get(room) else {
            return 0;
        };

        members
            .iter()
            .filter_map(|conn_id| membership.connections.get(conn_id))
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Send an event to a single connection.
    pub async fn send_to(&self, conn_id: Uuid, event: RelayEvent) {
        if let Some(tx) = self.inner.read().await.connections.get(&conn_id) {
            let _ = tx.send(event);
        }
    }

    pub async fn members(&self, room: &str) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(room)
            .map_or(0, HashSet::len)
    }

    #[cfg(test)]
    pub async fn rooms_of(&self, conn_id: Uuid) -> Vec<String> {
        self.inner
            .read()
            .await
            .rooms
            .iter()
            .filter(|(_, members)| members.contains(&conn_id))
            .map(|(room, _)| room.clone())
            .collect()
    }
}
