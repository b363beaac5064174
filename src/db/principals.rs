use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::*;

impl TestimonialDb {
    // =========================================================================
    // Principals
    // =========================================================================

    /// Insert or refresh a principal. The auth provider owns identity; this
    /// table only mirrors the ids it hands out so ownership has a FK target.
    pub fn upsert_user(&self, id: &str, name: &str, email: Option<&str>) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO users (id, name, email, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email",
            params![id, name, email, timestamp(Utc::now())],
        )?;
        Ok(())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Record a session token issued by the auth provider.
    pub fn create_session(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO sessions (token, user_id, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![token, user_id, timestamp(expires_at), timestamp(Utc::now())],
        )?;
        Ok(())
    }

    /// Map a session token to its principal id, ignoring expired sessions.
    pub fn resolve_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, DbError> {
        let user_id = self
            .conn
            .query_row(
                "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
                params![token, timestamp(now)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id)
    }
}
