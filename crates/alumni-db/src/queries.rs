use crate::models::{MessageRow, UserRow};
use crate::{Database, Result};
use rusqlite::{Connection, OptionalExtension, Row};

impl Database {
    // -- Users --

    /// Insert a member. Uniqueness of rollno and username is enforced by the
    /// table constraints and surfaces as `DbError::Duplicate`.
    pub fn create_user(
        &self,
        rollno: &str,
        fullname: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (rollno, fullname, username, password) VALUES (?1, ?2, ?3, ?4)",
                (rollno, fullname, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_rollno(&self, rollno: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "rollno", rollno))
    }

    /// Full table scan, in storage order.
    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT rollno, fullname, username, password FROM users")?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_users(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(n as u64)
        })
    }

    // -- Messages --

    /// Insert a message and read the stored row back, so the caller sees the
    /// server-assigned id and timestamp.
    pub fn insert_message(&self, sender: &str, receiver: &str, text: &str) -> Result<MessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (sender, receiver, message) VALUES (?1, ?2, ?3)",
                (sender, receiver, text),
            )?;
            let id = conn.last_insert_rowid();
            let row = conn.query_row(
                "SELECT id, sender, receiver, message, timestamp FROM messages WHERE id = ?1",
                [id],
                message_from_row,
            )?;
            Ok(row)
        })
    }

    /// Both directions between `a` and `b`, oldest first. Messages stored in
    /// the same second keep insertion order through the id tiebreak.
    pub fn get_conversation(&self, a: &str, b: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender, receiver, message, timestamp
                 FROM messages
                 WHERE (sender = ?1 AND receiver = ?2)
                    OR (sender = ?2 AND receiver = ?1)
                 ORDER BY timestamp ASC, id ASC",
            )?;
            let rows = stmt
                .query_map([a, b], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_messages(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok(n as u64)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is one of our own literals, never user input.
    let sql = format!("SELECT rollno, fullname, username, password FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

// Columns are nullable in the schema; rows written elsewhere may carry NULLs.
fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        rollno: row.get(0)?,
        fullname: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        username: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        password: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        receiver: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        message: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        timestamp: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}
