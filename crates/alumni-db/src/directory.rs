use std::sync::Arc;

use alumni_types::models::DirectoryEntry;

use crate::{Database, Result};

/// Read-only member listing over the users table.
#[derive(Clone)]
pub struct Directory {
    db: Arc<Database>,
}

impl Directory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn list_all(&self) -> Result<Vec<DirectoryEntry>> {
        let rows = self.db.list_users()?;
        Ok(rows
            .into_iter()
            .map(|row| DirectoryEntry {
                fullname: row.fullname,
                rollno: row.rollno,
            })
            .collect())
    }
}
