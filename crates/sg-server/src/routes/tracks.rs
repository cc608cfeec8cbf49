//! Track catalog routes. Writes are admin-only; see
//! [`require_admin`](crate::middleware::auth::require_admin).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use sg_core::{Category, Error, Track, TrackFilter, TrackId, UserEntitlement};
use sg_db::queries::tracks::TrackUpdate;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Query parameters for listing tracks.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrackQuery {
    /// One of `focus`, `meditation`, `ambient`, `nature`.
    pub category: Option<String>,
    /// Only premium tracks. Requires a premium account.
    pub premium: Option<bool>,
}

/// Public view of a track. The storage locator is never exposed.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TrackResponse {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_secs: u32,
    pub category: Category,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub is_premium: bool,
    pub play_count: u64,
    pub created_at: String,
    pub stream_url: String,
}

impl From<Track> for TrackResponse {
    fn from(t: Track) -> Self {
        Self {
            stream_url: format!("/api/stream/{}", t.id),
            id: t.id.to_string(),
            title: t.title,
            artist: t.artist,
            duration_secs: t.duration_secs,
            category: t.category,
            tags: t.tags,
            cover_image: t.cover_image,
            is_premium: t.is_premium,
            play_count: t.play_count,
            created_at: t.created_at,
        }
    }
}

/// GET /api/tracks
#[utoipa::path(
    get,
    path = "/api/tracks",
    params(TrackQuery),
    responses(
        (status = 200, description = "Tracks, newest first", body = Vec<TrackResponse>),
        (status = 400, description = "Unknown category"),
        (status = 403, description = "Premium listing requested by a free account")
    )
)]
pub async fn list_tracks(
    State(ctx): State<AppContext>,
    Extension(user): Extension<UserEntitlement>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<TrackQuery>,
) -> Result<Json<Vec<TrackResponse>>, AppError> {
    let with_id = |e: Error| AppError::new(e).with_request_id(request_id.0.clone());

    let category = params
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<Category>)
        .transpose()
        .map_err(with_id)?;

    let premium_only = params.premium.unwrap_or(false);
    if premium_only && !user.is_premium {
        return Err(with_id(Error::PremiumRequired));
    }

    let tracks = ctx
        .catalog
        .list_tracks(&TrackFilter {
            category,
            premium_only,
        })
        .map_err(with_id)?;

    Ok(Json(tracks.into_iter().map(TrackResponse::from).collect()))
}

/// GET /api/tracks/{id}
#[utoipa::path(
    get,
    path = "/api/tracks/{id}",
    params(("id" = String, Path, description = "Track ID")),
    responses(
        (status = 200, description = "Track details", body = TrackResponse),
        (status = 404, description = "Track not found")
    )
)]
pub async fn get_track(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<TrackResponse>, AppError> {
    let with_id = |e: Error| AppError::new(e).with_request_id(request_id.0.clone());

    let track_id = TrackId::parse_param(&id, "track id").map_err(with_id)?;
    let track = ctx
        .catalog
        .get_track(track_id)
        .map_err(with_id)?
        .ok_or_else(|| with_id(Error::not_found("track", track_id)))?;

    Ok(Json(track.into()))
}

/// Body for PUT /api/tracks/{id}. Omitted fields are left unchanged; an
/// empty `mime_type` or `cover_image` clears it.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateTrackRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration_secs: Option<u32>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub mime_type: Option<String>,
    pub cover_image: Option<String>,
    pub is_premium: Option<bool>,
}

impl From<UpdateTrackRequest> for TrackUpdate {
    fn from(r: UpdateTrackRequest) -> Self {
        Self {
            title: r.title,
            artist: r.artist,
            duration_secs: r.duration_secs,
            category: r.category,
            tags: r.tags,
            mime_type: r.mime_type,
            cover_image: r.cover_image,
            is_premium: r.is_premium,
        }
    }
}

/// PUT /api/tracks/{id}
#[utoipa::path(
    put,
    path = "/api/tracks/{id}",
    params(("id" = String, Path, description = "Track ID")),
    request_body = UpdateTrackRequest,
    responses(
        (status = 200, description = "Updated track", body = TrackResponse),
        (status = 400, description = "Invalid id or field"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Track not found")
    )
)]
pub async fn update_track(
    State(ctx): State<AppContext>,
    Extension(user): Extension<UserEntitlement>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTrackRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    let with_id = |e: Error| AppError::new(e).with_request_id(request_id.0.clone());

    let track_id = TrackId::parse_param(&id, "track id").map_err(with_id)?;
    let conn = sg_db::pool::get_conn(&ctx.db).map_err(with_id)?;
    let track = sg_db::queries::tracks::update_track(&conn, track_id, &payload.into())
        .map_err(with_id)?
        .ok_or_else(|| with_id(Error::not_found("track", track_id)))?;

    tracing::info!(track_id = %track_id, by = %user.user_id, "Track updated");
    Ok(Json(track.into()))
}

/// DELETE /api/tracks/{id}
///
/// Removes the catalog entry only; the stored blob is left in place.
#[utoipa::path(
    delete,
    path = "/api/tracks/{id}",
    params(("id" = String, Path, description = "Track ID")),
    responses(
        (status = 204, description = "Track deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Track not found")
    )
)]
pub async fn delete_track(
    State(ctx): State<AppContext>,
    Extension(user): Extension<UserEntitlement>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let with_id = |e: Error| AppError::new(e).with_request_id(request_id.0.clone());

    let track_id = TrackId::parse_param(&id, "track id").map_err(with_id)?;
    let conn = sg_db::pool::get_conn(&ctx.db).map_err(with_id)?;
    if !sg_db::queries::tracks::delete_track(&conn, track_id).map_err(with_id)? {
        return Err(with_id(Error::not_found("track", track_id)));
    }

    tracing::info!(track_id = %track_id, by = %user.user_id, "Track deleted");
    Ok(StatusCode::NO_CONTENT)
}
