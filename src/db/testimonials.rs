use rusqlite::{params, OptionalExtension, Row};

use super::*;
use crate::types::{NewTestimonial, TestimonialPatch};

const TESTIMONIAL_COLUMNS: &str =
    "id, name, testimony, org_name, role, image_url, user_id, created_at, updated_at";

impl TestimonialDb {
    // =========================================================================
    // Testimonials
    // =========================================================================

    /// All testimonials owned by `user_id`, oldest first.
    pub fn get_testimonials_for_user(&self, user_id: &str) -> Result<Vec<DbTestimonial>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE user_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![user_id], Self::map_testimonial_row)?;

        let mut testimonials = Vec::new();
        for row in rows {
            testimonials.push(row?);
        }
        Ok(testimonials)
    }

    /// A single testimonial, only if `user_id` owns it.
    pub fn get_testimonial_for_user(
        &self,
        id: i64,
        user_id: &str,
    ) -> Result<Option<DbTestimonial>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials
                     WHERE id = ?1 AND user_id = ?2"
                ),
                params![id, user_id],
                Self::map_testimonial_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Insert a testimonial owned by `user_id`. The store assigns the id.
    ///
    /// Any `user_id` carried on `new` is ignored.
    pub fn insert_testimonial(
        &self,
        user_id: &str,
        new: &NewTestimonial,
    ) -> Result<DbTestimonial, DbError> {
        let now = timestamp(Utc::now());
        let image_url = non_empty(&new.image_url);
        self.conn.execute(
            "INSERT INTO testimonials (name, testimony, org_name, role, image_url, user_id,
                                       created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                new.name,
                new.testimony,
                new.org_name,
                new.role,
                image_url,
                user_id,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(DbTestimonial {
            id,
            name: new.name.clone(),
            testimony: new.testimony.clone(),
            org_name: new.org_name.clone(),
            role: new.role.clone(),
            image_url: image_url.map(str::to_string),
            user_id: user_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Apply `patch` to the testimonial matching both `id` and `user_id`.
    ///
    /// Returns `None` when no row matched: the id does not exist or belongs to
    /// someone else. Fields absent from the patch keep their stored value.
    /// There is no version check, so the last successful write wins.
    pub fn update_testimonial_for_user(
        &self,
        id: i64,
        user_id: &str,
        patch: &TestimonialPatch,
    ) -> Result<Option<DbTestimonial>, DbError> {
        if patch.is_empty() {
            return self.get_testimonial_for_user(id, user_id);
        }

        // An empty image URL clears the stored one.
        let image_url = patch.image_url.as_deref().map(non_empty);
        let clear_image = matches!(image_url, Some(None));

        let changed = self.conn.execute(
            "UPDATE testimonials SET
                name = COALESCE(?3, name),
                testimony = COALESCE(?4, testimony),
                org_name = COALESCE(?5, org_name),
                role = COALESCE(?6, role),
                image_url = CASE WHEN ?8 THEN NULL ELSE COALESCE(?7, image_url) END,
                updated_at = ?9
             WHERE id = ?1 AND user_id = ?2",
            params![
                id,
                user_id,
                patch.name,
                patch.testimony,
                patch.org_name,
                patch.role,
                image_url.flatten(),
                clear_image,
                timestamp(Utc::now()),
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        self.get_testimonial_for_user(id, user_id)
    }

    /// Permanently delete the testimonial matching both `id` and `user_id`.
    /// Returns whether a row was removed.
    pub fn delete_testimonial_for_user(&self, id: i64, user_id: &str) -> Result<bool, DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM testimonials WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }

    pub fn count_testimonials_for_user(&self, user_id: &str) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM testimonials WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_testimonial_row(row: &Row<'_>) -> rusqlite::Result<DbTestimonial> {
        Ok(DbTestimonial {
            id: row.get(0)?,
            name: row.get(1)?,
            testimony: row.get(2)?,
            org_name: row.get(3)?,
            role: row.get(4)?,
            image_url: row.get(5)?,
            user_id: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
