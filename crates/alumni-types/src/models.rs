use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public view of a registered member. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub rollno: String,
    pub fullname: String,
    pub username: String,
}

/// One row of the member directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub fullname: String,
    pub rollno: String,
}

/// A persisted chat message. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub receiver: String,
    #[serde(rename = "message")]
    pub text: String,
    pub timestamp: DateTime<Utc>,
}
