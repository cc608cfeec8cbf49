//! [`TrackCatalog`] backed by the SQLite pool.

use sg_core::{Result, Track, TrackCatalog, TrackFilter, TrackId};

use crate::pool::{get_conn, DbPool};
use crate::queries::tracks;

/// Catalog reading tracks from the `tracks` table.
#[derive(Clone)]
pub struct SqliteCatalog {
    db: DbPool,
}

impl SqliteCatalog {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

impl TrackCatalog for SqliteCatalog {
    fn get_track(&self, id: TrackId) -> Result<Option<Track>> {
        let conn = get_conn(&self.db)?;
        tracks::get_track(&conn, id)
    }

    fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        let conn = get_conn(&self.db)?;
        tracks::list_tracks(&conn, filter)
    }
}
