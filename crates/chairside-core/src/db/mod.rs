//! Database layer for chairside.

mod chairs;
mod history;
mod queue;
mod schema;

pub use schema::*;
#[allow(unused_imports)]
pub use chairs::*;
#[allow(unused_imports)]
pub use history::*;
#[allow(unused_imports)]
pub use queue::*;

use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::models::Chair;

/// Number of treatment chairs in the default clinic layout.
pub const DEFAULT_CHAIR_COUNT: i64 = 5;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
///
/// Holds the only connection to the store; all mutation goes through the
/// typed accessors in this module, never through raw SQL from callers.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path with the default chair layout, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::open_with_chairs(path, DEFAULT_CHAIR_COUNT)
    }

    /// Open database at path, seeding `chair_count` chairs on first use.
    pub fn open_with_chairs<P: AsRef<Path>>(path: P, chair_count: i64) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize(chair_count)?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open_in_memory_with_chairs(DEFAULT_CHAIR_COUNT)
    }

    /// Create in-memory database with a custom chair count (for testing).
    pub fn open_in_memory_with_chairs(chair_count: i64) -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize(chair_count)?;
        Ok(db)
    }

    /// Initialize schema and seed the fixed chair set.
    fn initialize(&self, chair_count: i64) -> DbResult<()> {
        if chair_count < 1 {
            return Err(DbError::Constraint(format!(
                "Chair count must be at least 1, got {}",
                chair_count
            )));
        }
        self.conn.execute_batch(SCHEMA)?;

        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chairs", [], |row| row.get(0))?;
        if existing == 0 {
            let now = Utc::now();
            for id in 1..=chair_count {
                chairs::store_chair(&self.conn, &Chair::idle(id, now))?;
            }
        }
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}
