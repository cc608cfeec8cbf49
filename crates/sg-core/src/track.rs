//! Track and entitlement models.
//!
//! A [`Track`] is catalog metadata; its bytes live in a blob store and are
//! reached through [`Track::storage_locator`]. A [`UserEntitlement`] is what
//! the auth layer hands to the streaming path for each request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ids::{TrackId, UserId};

/// MIME type used when neither the catalog nor the blob store knows better.
pub const DEFAULT_MIME_TYPE: &str = "audio/mpeg";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Catalog category a track is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Focus,
    Meditation,
    Ambient,
    Nature,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Focus,
        Category::Meditation,
        Category::Ambient,
        Category::Nature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Focus => "focus",
            Category::Meditation => "meditation",
            Category::Ambient => "ambient",
            Category::Nature => "nature",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("Unknown category: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// A playable track in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub duration_secs: u32,
    pub category: Category,
    pub tags: Vec<String>,
    /// Opaque reference resolved by the blob store (relative path or object key).
    pub storage_locator: String,
    /// Size recorded at ingest time. The blob store's answer wins when streaming.
    pub size_bytes: Option<u64>,
    pub mime_type: Option<String>,
    pub cover_image: Option<String>,
    pub is_premium: bool,
    pub play_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl Track {
    /// The MIME type to advertise for this track.
    ///
    /// Preference order: the catalog value, then `detected` (usually what the
    /// blob store reported), then [`DEFAULT_MIME_TYPE`]. Blank strings count
    /// as absent.
    pub fn effective_mime_type<'a>(&'a self, detected: Option<&'a str>) -> &'a str {
        self.mime_type
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or(detected.filter(|m| !m.trim().is_empty()))
            .unwrap_or(DEFAULT_MIME_TYPE)
    }
}

// ---------------------------------------------------------------------------
// UserEntitlement
// ---------------------------------------------------------------------------

/// Account role. Only admins may edit the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::Validation(format!("Unknown role: {s}"))),
        }
    }
}

/// The requesting user's identity, premium status and role.
///
/// Produced per request by the authentication middleware; never persisted
/// by the streaming path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserEntitlement {
    pub user_id: UserId,
    pub is_premium: bool,
    pub role: Role,
}

impl UserEntitlement {
    /// A regular (non-admin) caller.
    pub fn new(user_id: UserId, is_premium: bool) -> Self {
        Self {
            user_id,
            is_premium,
            role: Role::User,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn track(is_premium: bool) -> Track {
        Track {
            id: TrackId::new(),
            title: "Rainfall".into(),
            artist: "Field Recordings".into(),
            duration_secs: 240,
            category: Category::Nature,
            tags: vec!["rain".into()],
            storage_locator: "music/rainfall.mp3".into(),
            size_bytes: Some(1000),
            mime_type: None,
            cover_image: None,
            is_premium,
            play_count: 0,
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }
}
