use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (rollno TEXT PRIMARY KEY, fullname TEXT, username TEXT UNIQUE, password TEXT);

        CREATE TABLE IF NOT EXISTS messages (id INTEGER PRIMARY KEY AUTOINCREMENT, sender TEXT, receiver TEXT, message TEXT, timestamp DATETIME DEFAULT CURRENT_TIMESTAMP);

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender, receiver);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
