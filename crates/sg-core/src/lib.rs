//! sg-core: shared types, IDs, errors, configuration, and the pure decision
//! logic of the streaming path.
//!
//! This crate is the foundational dependency for all other sg-* crates. It
//! owns the [`Track`] and [`UserEntitlement`] models, the byte-range parser
//! used by the stream responder, and the premium access gate. Neither of the
//! latter perform I/O, so they can be evaluated before any storage is touched.

pub mod access;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ids;
pub mod range;
pub mod track;

// Re-export the most commonly used items at the crate root.
pub use access::{authorize, Access, DenyReason};
pub use catalog::{TrackCatalog, TrackFilter};
pub use error::{Error, Result};
pub use ids::*;
pub use range::{parse_range, ByteRange, RangeRequest};
pub use track::*;
