//! HTTP middleware.
//!
//! Layer order on `/api`: request id (outermost, whole app), rate limit,
//! then auth on the protected routes.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{auth_middleware, extract_token, resolve_entitlement};
pub use rate_limit::{create_limiter, rate_limit_middleware, SharedLimiter};
pub use request_id::{request_id_middleware, RequestId};
