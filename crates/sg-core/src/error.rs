//! Unified error type for the soundgate application.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in soundgate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller presented no valid credential.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "track", "blob").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The track is premium-only and the caller is not entitled to it.
    #[error("This content is only available to premium members")]
    PremiumRequired,

    /// The caller is authenticated but lacks the role for this action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested byte range cannot be served for a resource of `size` bytes.
    #[error("Range not satisfiable for resource of {size} bytes")]
    RangeUnsatisfiable {
        /// Total size of the resource, reported back in `Content-Range`.
        size: u64,
    },

    /// Reading from the blob store failed (origin error, filesystem I/O).
    #[error("Read failure: {0}")]
    ReadFailure(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation outside the streaming path failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Unauthenticated(_) => 401,
            Error::NotFound { .. } => 404,
            Error::PremiumRequired => 403,
            Error::Forbidden(_) => 403,
            Error::RangeUnsatisfiable { .. } => 416,
            Error::ReadFailure(_) => 500,
            Error::Validation(_) => 400,
            Error::Conflict(_) => 409,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Unexpected(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::ReadFailure`].
    pub fn read_failure(message: impl fmt::Display) -> Self {
        Error::ReadFailure(message.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
