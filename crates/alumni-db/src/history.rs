use std::sync::Arc;

use alumni_types::models::Message;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::models::MessageRow;
use crate::{Database, DbError, Result};

/// Query and append over the messages table, scoped to a pair of members.
///
/// There is no cache: every fetch re-reads the store.
#[derive(Clone)]
pub struct ChatHistory {
    db: Arc<Database>,
}

impl ChatHistory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All messages exchanged between `a` and `b` in either direction,
    /// oldest first. Unpaginated.
    pub fn fetch_conversation(&self, a: &str, b: &str) -> Result<Vec<Message>> {
        let rows = self.db.get_conversation(a, b)?;
        Ok(rows.into_iter().map(into_message).collect())
    }

    /// Persist one message. Missing or blank text is rejected before the
    /// store is touched.
    pub fn append_message(&self, sender: &str, receiver: &str, text: Option<&str>) -> Result<Message> {
        let text = match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(DbError::EmptyMessage),
        };

        let row = self.db.insert_message(sender, receiver, text)?;
        debug!("Stored message {} from {} to {}", row.id, sender, receiver);
        Ok(into_message(row))
    }
}

fn into_message(row: MessageRow) -> Message {
    let timestamp = parse_timestamp(&row.timestamp).unwrap_or_else(|| {
        warn!("Corrupt timestamp '{}' on message {}", row.timestamp, row.id);
        DateTime::default()
    });

    Message {
        id: row.id,
        sender: row.sender,
        receiver: row.receiver,
        text: row.message,
        timestamp,
    }
}

/// SQLite's CURRENT_TIMESTAMP is "YYYY-MM-DD HH:MM:SS" in UTC with no zone.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
