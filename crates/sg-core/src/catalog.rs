//! Track lookup collaborator.
//!
//! The streaming path only needs "find a track by id"; listing exists for the
//! catalog routes. `sg-db` provides the SQLite implementation.

use crate::error::Result;
use crate::ids::TrackId;
use crate::track::{Category, Track};

/// Filter for [`TrackCatalog::list_tracks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFilter {
    pub category: Option<Category>,
    /// Restrict the listing to premium tracks.
    pub premium_only: bool,
}

/// Read access to track metadata.
pub trait TrackCatalog: Send + Sync {
    /// Look up a single track. `Ok(None)` means the id is unknown.
    fn get_track(&self, id: TrackId) -> Result<Option<Track>>;

    /// List tracks matching `filter`, newest first.
    fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>>;
}
