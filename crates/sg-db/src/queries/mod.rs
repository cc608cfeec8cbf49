//! Database query modules.

pub mod auth;
pub mod tracks;
pub mod users;
