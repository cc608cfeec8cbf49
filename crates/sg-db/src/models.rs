//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. Tracks map straight onto [`sg_core::Track`].

use rusqlite::types::Type;
use sg_core::{Category, Role, SessionId, Track, UserEntitlement, UserId};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))?;
    Ok(T::from(uuid))
}

/// Read a non-negative integer column into `u64`.
fn get_u64(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<u64> {
    let v: i64 = row.get(idx)?;
    u64::try_from(v).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub is_premium: bool,
    pub created_at: String,
}

impl User {
    pub const COLS: &'static str = "id, username, password_hash, role, is_premium, created_at";

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            role: row.get(3)?,
            is_premium: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    /// Unknown role strings are treated as a regular user.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_default()
    }

    pub fn entitlement(&self) -> UserEntitlement {
        UserEntitlement::new(self.id, self.is_premium).with_role(self.role())
    }
}

// ---------------------------------------------------------------------------
// AuthToken
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuthToken {
    pub id: SessionId,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: String,
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

pub const TRACK_COLS: &str = "id, title, artist, duration_secs, category, tags, storage_locator, \
     size_bytes, mime_type, cover_image, is_premium, play_count, created_at, updated_at";

/// Build a [`Track`] from a row selected with [`TRACK_COLS`].
pub fn track_from_row(row: &rusqlite::Row) -> rusqlite::Result<Track> {
    let category: String = row.get(4)?;
    let category: Category = category.parse().map_err(|e| conversion_error(4, e))?;

    let tags: String = row.get(5)?;
    let tags: Vec<String> = serde_json::from_str(&tags).map_err(|e| conversion_error(5, e))?;

    let size_bytes: Option<i64> = row.get(7)?;
    let size_bytes = size_bytes
        .map(u64::try_from)
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Integer, Box::new(e)))?;

    Ok(Track {
        id: parse_id(row, 0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        duration_secs: row.get(3)?,
        category,
        tags,
        storage_locator: row.get(6)?,
        size_bytes,
        mime_type: row.get(8)?,
        cover_image: row.get(9)?,
        is_premium: row.get(10)?,
        play_count: get_u64(row, 11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
