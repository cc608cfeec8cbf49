//! Track catalog operations.

use chrono::Utc;
use rusqlite::Connection;
use sg_core::{Category, Error, Result, Track, TrackFilter, TrackId};

use crate::models::{track_from_row, TRACK_COLS};

/// Fields supplied when registering a track.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub title: String,
    pub artist: String,
    pub duration_secs: u32,
    pub category: Category,
    pub tags: Vec<String>,
    pub storage_locator: String,
    pub size_bytes: Option<u64>,
    pub mime_type: Option<String>,
    pub cover_image: Option<String>,
    pub is_premium: bool,
}

/// Partial edit of a track's catalog fields. `None` leaves a field as is.
///
/// The storage locator and recorded size are fixed at ingest time.
#[derive(Debug, Clone, Default)]
pub struct TrackUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration_secs: Option<u32>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub mime_type: Option<String>,
    pub cover_image: Option<String>,
    pub is_premium: Option<bool>,
}

/// Insert a track and return the stored record.
pub fn create_track(conn: &Connection, new: &NewTrack) -> Result<Track> {
    if new.storage_locator.trim().is_empty() {
        return Err(Error::Validation("storage locator is required".into()));
    }

    let id = TrackId::new();
    let now = Utc::now().to_rfc3339();
    let tags = serde_json::to_string(&new.tags)
        .map_err(|e| Error::Unexpected(format!("tag serialization: {e}")))?;
    let size = new
        .size_bytes
        .map(i64::try_from)
        .transpose()
        .map_err(|_| Error::Validation("size_bytes out of range".into()))?;

    conn.execute(
        "INSERT INTO tracks (id, title, artist, duration_secs, category, tags, storage_locator,
                             size_bytes, mime_type, cover_image, is_premium, play_count,
                             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?12)",
        rusqlite::params![
            id.to_string(),
            new.title,
            new.artist,
            new.duration_secs,
            new.category.as_str(),
            tags,
            new.storage_locator,
            size,
            new.mime_type,
            new.cover_image,
            new.is_premium,
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Track {
        id,
        title: new.title.clone(),
        artist: new.artist.clone(),
        duration_secs: new.duration_secs,
        category: new.category,
        tags: new.tags.clone(),
        storage_locator: new.storage_locator.clone(),
        size_bytes: new.size_bytes,
        mime_type: new.mime_type.clone(),
        cover_image: new.cover_image.clone(),
        is_premium: new.is_premium,
        play_count: 0,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get a track by primary key.
pub fn get_track(conn: &Connection, id: TrackId) -> Result<Option<Track>> {
    let q = format!("SELECT {TRACK_COLS} FROM tracks WHERE id = ?1");
    match conn.query_row(&q, [id.to_string()], track_from_row) {
        Ok(t) => Ok(Some(t)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Apply `update` to a track. Returns the stored record, or `None` when the
/// id is unknown.
pub fn update_track(
    conn: &Connection,
    id: TrackId,
    update: &TrackUpdate,
) -> Result<Option<Track>> {
    let Some(mut track) = get_track(conn, id)? else {
        return Ok(None);
    };

    if let Some(title) = &update.title {
        if title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".into()));
        }
        track.title = title.clone();
    }
    if let Some(artist) = &update.artist {
        track.artist = artist.clone();
    }
    if let Some(duration) = update.duration_secs {
        track.duration_secs = duration;
    }
    if let Some(category) = update.category {
        track.category = category;
    }
    if let Some(tags) = &update.tags {
        track.tags = tags.clone();
    }
    if let Some(mime) = &update.mime_type {
        track.mime_type = Some(mime.clone()).filter(|m| !m.trim().is_empty());
    }
    if let Some(cover) = &update.cover_image {
        track.cover_image = Some(cover.clone()).filter(|c| !c.trim().is_empty());
    }
    if let Some(premium) = update.is_premium {
        track.is_premium = premium;
    }
    track.updated_at = Utc::now().to_rfc3339();

    let tags = serde_json::to_string(&track.tags)
        .map_err(|e| Error::Unexpected(format!("tag serialization: {e}")))?;
    conn.execute(
        "UPDATE tracks SET title = ?1, artist = ?2, duration_secs = ?3, category = ?4, tags = ?5,
                           mime_type = ?6, cover_image = ?7, is_premium = ?8, updated_at = ?9
         WHERE id = ?10",
        rusqlite::params![
            track.title,
            track.artist,
            track.duration_secs,
            track.category.as_str(),
            tags,
            track.mime_type,
            track.cover_image,
            track.is_premium,
            track.updated_at,
            id.to_string(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Some(track))
}

/// Delete a track by ID. Returns true if a row was deleted.
pub fn delete_track(conn: &Connection, id: TrackId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM tracks WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// List tracks matching `filter`, newest first.
pub fn list_tracks(conn: &Connection, filter: &TrackFilter) -> Result<Vec<Track>> {
    let mut q = format!(
        "SELECT {TRACK_COLS} FROM tracks WHERE (?1 IS NULL OR category = ?1)"
    );
    if filter.premium_only {
        q.push_str(" AND is_premium = 1");
    }
    q.push_str(" ORDER BY created_at DESC, rowid DESC");

    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([filter.category.map(|c| c.as_str())], track_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}
