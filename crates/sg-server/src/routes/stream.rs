//! Audio streaming route.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::Extension;

use sg_core::{TrackId, UserEntitlement};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;
use crate::streaming::StreamResponder;

/// GET /api/stream/{track_id}
///
/// Serves the track's audio, honouring a single `Range: bytes=` header.
/// `HEAD` is answered with the same headers and no body.
#[utoipa::path(
    get,
    path = "/api/stream/{track_id}",
    params(
        ("track_id" = String, Path, description = "Track ID"),
        ("Range" = Option<String>, Header, description = "Single byte range, e.g. `bytes=0-1023`"),
    ),
    responses(
        (status = 200, description = "Full audio content", content_type = "audio/mpeg"),
        (status = 206, description = "Partial audio content", content_type = "audio/mpeg"),
        (status = 400, description = "Malformed track id"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Premium content"),
        (status = 404, description = "Track or audio file not found"),
        (status = 416, description = "Range not satisfiable"),
        (status = 500, description = "Storage failure"),
    )
)]
pub async fn stream_track(
    State(ctx): State<AppContext>,
    Extension(user): Extension<UserEntitlement>,
    Extension(request_id): Extension<RequestId>,
    method: Method,
    Path(track_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let head_only = method == Method::HEAD;

    let result = match TrackId::parse_param(&track_id, "track id") {
        Ok(id) => {
            StreamResponder::from_context(&ctx)
                .respond(id, &user, range, head_only)
                .await
        }
        Err(e) => Err(e),
    };

    let response = match result {
        Ok(response) => response,
        Err(e) => AppError::new(e).with_request_id(request_id.0).into_response(),
    };

    metrics::counter!(
        "soundgate_stream_requests_total",
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);

    response
}
