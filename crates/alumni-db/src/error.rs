use std::fmt;

use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Column whose uniqueness constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Rollno,
    Username,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rollno => f.write_str("roll number"),
            Self::Username => f.write_str("username"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("message text is empty")]
    EmptyMessage,

    #[error("{0} is already registered")]
    Duplicate(UniqueField),

    #[error("store error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        // SQLite reports both the primary key and UNIQUE index violations as
        // "UNIQUE constraint failed: <table>.<column>".
        if let rusqlite::Error::SqliteFailure(ffi, Some(msg)) = &err {
            if ffi.code == ErrorCode::ConstraintViolation {
                if msg.contains("users.username") {
                    return Self::Duplicate(UniqueField::Username);
                }
                if msg.contains("users.rollno") {
                    return Self::Duplicate(UniqueField::Rollno);
                }
            }
        }
        Self::Sqlite(err)
    }
}
