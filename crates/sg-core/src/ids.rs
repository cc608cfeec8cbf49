//! Typed ID wrappers providing compile-time safety for entity identifiers.
//!
//! Each ID type is a newtype over `Uuid`, preventing accidental misuse
//! (e.g., passing a `UserId` where a `TrackId` is expected). IDs arriving from
//! URLs go through `parse_param`, which turns a malformed value into a
//! validation error instead of a lookup miss.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Generate a newtype ID wrapper over `Uuid`.
///
/// Each generated type gets `new()`, `parse_param()`, `Display`/`FromStr`
/// over the inner UUID, `From<Uuid>` both ways, and a random `Default`.
macro_rules! typed_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                /// Create a new random ID.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                /// Parse a path or query parameter, naming `what` in the
                /// validation error on failure.
                pub fn parse_param(value: &str, what: &str) -> Result<Self> {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| Error::Validation(format!("Invalid {what}: {value}")))
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = uuid::Error;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    Uuid::parse_str(s).map(Self)
                }
            }

            impl From<Uuid> for $name {
                fn from(uuid: Uuid) -> Self {
                    Self(uuid)
                }
            }

            impl From<$name> for Uuid {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )+
    };
}

typed_id! {
    /// Unique identifier for a track in the catalog.
    TrackId,
    /// Unique identifier for a user.
    UserId,
    /// Unique identifier for an authentication session token.
    SessionId,
}
