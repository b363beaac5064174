//! SQLite-backed store for principals, sessions and testimonials.
//!
//! The database lives at `~/.testimonials/testimonials.db` unless the config
//! names another path. Every testimonial mutation is scoped by the owning
//! user: the `user_id` predicate is part of the SQL itself, never a check
//! performed after the fact.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

pub mod principals;
pub mod testimonials;
pub mod types;
pub use types::*;

pub struct TestimonialDb {
    conn: Connection,
}

impl TestimonialDb {
    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<DbError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(DbError::from)?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT").map_err(DbError::from)?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at the configured path, falling back to
    /// `~/.testimonials/testimonials.db`, and apply the schema.
    pub fn open(path: Option<PathBuf>) -> Result<Self, DbError> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        // Ownership rows must reference a real principal.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        log::info!("Opened testimonial store at {}", path.display());
        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.testimonials/testimonials.db`.
    fn default_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".testimonials").join("testimonials.db"))
    }

    /// Cheap liveness query used by the health probe.
    pub fn ping(&self) -> Result<(), DbError> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

/// Timestamp format stored in every `*_at` column. Fixed-width UTC so that
/// string comparison in SQL orders the same as time.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}


// =============================================================================
// Tests
// =============================================================================
