//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`sg_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and every failure becomes a response at
//! the request boundary.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: sg_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: sg_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn inner(&self) -> &sg_core::Error {
        &self.inner
    }
}

impl From<sg_core::Error> for AppError {
    fn from(e: sg_core::Error) -> Self {
        Self::new(e)
    }
}

/// Machine-readable code for an error.
pub fn error_code(err: &sg_core::Error) -> &'static str {
    match err {
        sg_core::Error::Unauthenticated(_) => "unauthenticated",
        sg_core::Error::NotFound { .. } => "not_found",
        sg_core::Error::PremiumRequired => "premium_required",
        sg_core::Error::Forbidden(_) => "forbidden",
        sg_core::Error::RangeUnsatisfiable { .. } => "range_not_satisfiable",
        sg_core::Error::ReadFailure(_) => "read_failure",
        sg_core::Error::Validation(_) => "validation_error",
        sg_core::Error::Conflict(_) => "conflict",
        sg_core::Error::Database { .. } => "database_error",
        sg_core::Error::Io { .. } => "io_error",
        sg_core::Error::Unexpected(_) => "internal_error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match &self.inner {
            sg_core::Error::PremiumRequired => {
                let body = json!({
                    "message": self.inner.to_string(),
                    "isPremiumContent": true,
                });
                return (status, axum::Json(body)).into_response();
            }
            sg_core::Error::RangeUnsatisfiable { size } => {
                return (
                    status,
                    [
                        (header::CONTENT_RANGE, format!("bytes */{size}")),
                        (header::ACCEPT_RANGES, "bytes".to_string()),
                    ],
                    Body::empty(),
                )
                    .into_response();
            }
            _ => {}
        }

        let message = if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                request_id = self.request_id.as_deref().unwrap_or("-"),
                "Server error in API handler"
            );
            "Internal server error".to_string()
        } else {
            self.inner.to_string()
        };

        let body = json!({
            "message": message,
            "code": error_code(&self.inner),
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
