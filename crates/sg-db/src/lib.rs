//! sg-db: database access and persistence layer.
//!
//! SQLite-backed storage with connection pooling, embedded migrations, typed
//! models, and query modules for tracks, users, and auth tokens.
//! [`SqliteCatalog`] adapts the pool to the [`sg_core::TrackCatalog`] trait
//! the streaming path depends on.

pub mod catalog;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use catalog::SqliteCatalog;
