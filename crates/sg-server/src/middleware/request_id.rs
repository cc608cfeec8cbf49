//! Request correlation ids.
//!
//! Every request gets an id: the caller's `x-request-id` when it is short
//! printable ASCII, a fresh UUID otherwise. Handlers read it from the
//! [`RequestId`] extension to stamp error bodies; the rest of the stack runs
//! inside an `info_span!("request")` carrying it, and the response echoes it.

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the id in both directions.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_INCOMING_LEN: usize = 128;

/// Correlation id for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse the caller's id if acceptable, otherwise mint one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let incoming = headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| {
                !v.is_empty()
                    && v.len() <= MAX_INCOMING_LEN
                    && v.bytes().all(|b| b.is_ascii_graphic())
            });

        match incoming {
            Some(id) => Self(id.to_string()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Attach a [`RequestId`] to the request, trace under it, and echo it back.
pub async fn request_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    let id = RequestId::from_headers(request.headers());
    let span = tracing::info_span!(
        "request",
        request_id = %id.as_str(),
        method = %request.method(),
        path = %request.uri().path(),
    );
    let echo = HeaderValue::from_str(id.as_str()).ok();
    request.extensions_mut().insert(id);

    let mut response = next.run(request).instrument(span).await;
    if let Some(value) = echo {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}
