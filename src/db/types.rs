//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Testimonial;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A row from the `testimonials` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTestimonial {
    pub id: i64,
    pub name: String,
    pub testimony: String,
    pub org_name: String,
    pub role: String,
    /// NULL until the upload step hands back a hosted URL.
    pub image_url: Option<String>,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DbTestimonial> for Testimonial {
    fn from(row: DbTestimonial) -> Self {
        Testimonial {
            id: row.id,
            name: row.name,
            testimony: row.testimony,
            org_name: row.org_name,
            role: row.role,
            image_url: row.image_url.unwrap_or_default(),
            user_id: row.user_id,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}
