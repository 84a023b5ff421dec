use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use alumni_db::{ChatHistory, DbError};
use alumni_types::events::{ChatPayload, RelayEvent};
use alumni_types::models::Message;

use crate::rooms::RoomRegistry;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The message failed validation; nothing was stored or broadcast.
    #[error("message rejected: {0}")]
    Rejected(DbError),

    /// The store could not persist the message; nothing was broadcast.
    #[error("message not delivered: {0}")]
    Store(DbError),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<DbError> for RelayError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::EmptyMessage | DbError::Duplicate(_) => Self::Rejected(err),
            other => Self::Store(other),
        }
    }
}

/// Outcome of a successful send.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message: Message,
    pub recipients: usize,
}

/// Relays chat messages to room members after persisting them.
#[derive(Clone)]
pub struct Relay {
    history: ChatHistory,
    rooms: RoomRegistry,
}

impl Relay {
    pub fn new(history: ChatHistory, rooms: RoomRegistry) -> Self {
        Self { history, rooms }
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub async fn connect(&self) -> (Uuid, mpsc::UnboundedReceiver<RelayEvent>) {
        self.rooms.connect().await
    }

    pub async fn join(&self, conn_id: Uuid, username: &str, room: &str) {
        if self.rooms.join(conn_id, room).await {
            let size = self.rooms.members(room).await;
            info!("{} ({}) joined room {} ({} member(s))", username, conn_id, room, size);
        }
    }

    /// Persist first, then broadcast `receive_message` to everyone in the
    /// payload's room, sender included. On any error nothing is broadcast.
    pub async fn send(&self, payload: ChatPayload) -> Result<Delivery, RelayError> {
        // Run blocking DB insert off the async runtime
        let history = self.history.clone();
        let (sender, receiver, text) = (
            payload.sender.clone(),
            payload.receiver.clone(),
            payload.message.clone(),
        );
        let message = tokio::task::spawn_blocking(move || {
            history.append_message(&sender, &receiver, Some(text.as_str()))
        })
        .await?
        .map_err(|e| {
            error!("Failed to store message from {}: {}", payload.sender, e);
            RelayError::from(e)
        })?;

        let room = payload.room.clone();
        let recipients = self
            .rooms
            .broadcast(&room, &RelayEvent::ReceiveMessage(payload))
            .await;
        debug!("Message {} relayed to {} member(s) of {}", message.id, recipients, room);

        Ok(Delivery { message, recipients })
    }

    /// Report a failure to one connection only.
    pub async fn notify_error(&self, conn_id: Uuid, reason: impl Into<String>) {
        self.rooms
            .send_to(conn_id, RelayEvent::Error { reason: reason.into() })
            .await;
    }

    pub async fn disconnect(&self, conn_id: Uuid) {
        self.rooms.disconnect(conn_id).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alumni_db::Database;

    use super::*;

    fn relay() -> (Arc<Database>, Relay) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let relay = Relay::new(ChatHistory::new(db.clone()), RoomRegistry::new());
        (db, relay)
    }

    fn payload(sender: &str, receiver: &str, message: &str, room: &str) -> ChatPayload {
        ChatPayload {
            sender: sender.into(),
            receiver: receiver.into(),
            message: message.into(),
            room: room.into(),
        }
    }

    #[tokio::test]
    async fn alice_and_bob_in_one_room() {
        let (_db, relay) = relay();
        let (alice, mut alice_rx) = relay.connect().await;
        let (bob, mut bob_rx) = relay.connect().await;

        relay.join(alice, "alice", "r1").await;
        relay.join(bob, "bob", "r1").await;

        let sent = payload("alice", "bob", "hello", "r1");
        let delivery = relay.send(sent.clone()).await.unwrap();
        assert_eq!(delivery.recipients, 2);

        let expected = RelayEvent::ReceiveMessage(sent);
        assert_eq!(alice_rx.recv().await, Some(expected.clone()));
        assert_eq!(bob_rx.recv().await, Some(expected));

        let convo = relay.history().fetch_conversation("alice", "bob").unwrap();
        assert_eq!(convo.len(), 1);
        assert_eq!(convo[0].text, "hello");
        assert_eq!(convo[0].sender, "alice");
        assert_eq!(convo[0].receiver, "bob");
    }

    #[tokio::test]
    async fn non_members_hear_nothing() {
        let (_db, relay) = relay();
        let (alice, mut alice_rx) = relay.connect().await;
        let (carol, mut carol_rx) = relay.connect().await;
        relay.join(alice, "alice", "r1").await;
        relay.join(carol, "carol", "r2").await;

        relay.send(payload("alice", "bob", "psst", "r1")).await.unwrap();

        assert!(alice_rx.recv().await.is_some());
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_broadcast() {
        let (db, relay) = relay();
        let (alice, mut alice_rx) = relay.connect().await;
        relay.join(alice, "alice", "r1").await;

        let err = relay.send(payload("alice", "bob", "", "r1")).await.unwrap_err();
        assert!(matches!(err, RelayError::Rejected(DbError::EmptyMessage)));
        assert!(alice_rx.try_recv().is_err());
        assert_eq!(db.count_messages().unwrap(), 0);
    }

    #[tokio::test]
    async fn store_failure_prevents_broadcast() {
        let (db, relay) = relay();
        let (alice, mut alice_rx) = relay.connect().await;
        relay.join(alice, "alice", "r1").await;

        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE messages")?;
            Ok(())
        })
        .unwrap();

        let err = relay.send(payload("alice", "bob", "lost", "r1")).await.unwrap_err();
        assert!(matches!(err, RelayError::Store(_)));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnected_connection_stops_receiving() {
        let (_db, relay) = relay();
        let (alice, _alice_rx) = relay.connect().await;
        let (bob, mut bob_rx) = relay.connect().await;
        relay.join(alice, "alice", "r1").await;
        relay.join(bob, "bob", "r1").await;

        relay.disconnect(bob).await;
        let delivery = relay.send(payload("alice", "bob", "gone?", "r1")).await.unwrap();

        assert_eq!(delivery.recipients, 1);
        // The registry dropped bob's sender, so the channel is closed and empty.
        assert_eq!(bob_rx.recv().await, None);
    }

    #[tokio::test]
    async fn errors_go_only_to_the_named_connection() {
        let (_db, relay) = relay();
        let (alice, mut alice_rx) = relay.connect().await;
        let (bob, mut bob_rx) = relay.connect().await;
        relay.join(alice, "alice", "r1").await;
        relay.join(bob, "bob", "r1").await;

        relay.notify_error(alice, "nope").await;
        assert_eq!(
            alice_rx.recv().await,
            Some(RelayEvent::Error { reason: "nope".into() })
        );
        assert!(bob_rx.try_recv().is_err());
    }
}
