//! Authentication route handlers: login, logout, status.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::{extract_token, resolve_entitlement, service_user_id, SESSION_COOKIE};

/// Login request payload.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Auth status response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthStatusResponse {
    pub auth_enabled: bool,
    pub authenticated: bool,
    pub is_premium: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(ctx): State<AppContext>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let auth_config = &ctx.config.auth;

    if !auth_config.enabled {
        return Ok((
            StatusCode::OK,
            HeaderMap::new(),
            Json(AuthResponse {
                success: true,
                message: "Auth disabled".into(),
                token: None,
                expires_at: None,
            }),
        ));
    }

    let conn = sg_db::pool::get_conn(&ctx.db)?;
    let invalid = || sg_core::Error::Unauthenticated("Invalid credentials".into());

    let user = sg_db::queries::users::get_user_by_username(&conn, payload.username.trim())?
        .ok_or_else(invalid)?;

    let password_valid = bcrypt::verify(&payload.password, &user.password_hash).unwrap_or(false);
    if !password_valid {
        tracing::info!(username = %user.username, "Failed login");
        return Err(invalid().into());
    }

    let now = Utc::now();
    let pruned = sg_db::queries::auth::delete_expired_tokens(&conn, &now.to_rfc3339())?;
    if pruned > 0 {
        tracing::debug!("Pruned {pruned} expired auth tokens");
    }

    let token = uuid::Uuid::new_v4().simple().to_string();
    let hours = i64::try_from(auth_config.session_timeout_hours).unwrap_or(i64::MAX / 3600);
    let expires = now + Duration::hours(hours.clamp(1, 24 * 365));
    let expires_str = expires.to_rfc3339();

    sg_db::queries::auth::create_token(&conn, user.id, &token, &expires_str)?;
    tracing::info!(username = %user.username, "User logged in");

    let mut headers = HeaderMap::new();
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        (expires - now).num_seconds()
    );
    if let Ok(value) = cookie.parse() {
        headers.insert(header::SET_COOKIE, value);
    }

    Ok((
        StatusCode::OK,
        headers,
        Json(AuthResponse {
            success: true,
            message: "Login successful".into(),
            token: Some(token),
            expires_at: Some(expires_str),
        }),
    ))
}

/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out")
    )
)]
pub async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = extract_token(&headers) {
        let conn = sg_db::pool::get_conn(&ctx.db)?;
        sg_db::queries::auth::delete_token(&conn, &token)?;
    }

    let clear = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    Ok((StatusCode::OK, [(header::SET_COOKIE, clear)]))
}

/// GET /api/auth/status
#[utoipa::path(
    get,
    path = "/api/auth/status",
    responses(
        (status = 200, description = "Auth status", body = AuthStatusResponse)
    )
)]
pub async fn auth_status(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<AuthStatusResponse>, AppError> {
    let auth_config = &ctx.config.auth;
    let token = extract_token(&headers);

    let Some(user) = resolve_entitlement(auth_config, &ctx.db, token.as_deref())? else {
        return Ok(Json(AuthStatusResponse {
            auth_enabled: true,
            authenticated: false,
            is_premium: false,
            user_id: None,
            username: None,
            role: None,
        }));
    };

    if user.user_id == service_user_id() {
        return Ok(Json(AuthStatusResponse {
            auth_enabled: auth_config.enabled,
            authenticated: true,
            is_premium: user.is_premium,
            user_id: None,
            username: None,
            role: auth_config.enabled.then(|| "service".to_string()),
        }));
    }

    let conn = sg_db::pool::get_conn(&ctx.db)?;
    let record = sg_db::queries::users::get_user_by_id(&conn, user.user_id)?;
    Ok(Json(AuthStatusResponse {
        auth_enabled: true,
        authenticated: true,
        is_premium: user.is_premium,
        user_id: Some(user.user_id.to_string()),
        username: record.as_ref().map(|u| u.username.clone()),
        role: record.map(|u| u.role),
    }))
}
