//! Database row types: these map directly to SQLite rows.
//! Distinct from alumni-types models to keep the DB layer independent.

pub struct UserRow {
    pub rollno: String,
    pub fullname: String,
    pub username: String,
    pub password: String,
}

pub struct MessageRow {
    pub id: i64,
    pub sender: String,
    pub receiver: String,
    pub message: String,
    pub timestamp: String,
}
