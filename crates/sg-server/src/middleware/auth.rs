//! Authentication middleware.
//!
//! Resolves the caller into a [`UserEntitlement`] from a bearer token or the
//! session cookie and inserts it into request extensions for downstream
//! handlers. Applied to protected routes only; `/api/auth/*` and `/health`
//! stay open. [`require_admin`] sits behind it on catalog write routes.

use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use uuid::Uuid;

use sg_core::config::AuthConfig;
use sg_core::{Error, Result, Role, UserEntitlement, UserId};
use sg_db::pool::DbPool;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Cookie name for browser sessions.
pub const SESSION_COOKIE: &str = "soundgate_session";

/// Identity used for requests when auth is disabled, and for the API key.
pub fn service_user_id() -> UserId {
    UserId::from(Uuid::nil())
}

/// Extract a bearer token or session cookie from request headers.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let prefix = format!("{SESSION_COOKIE}=");
    cookies
        .split(';')
        .filter_map(|part| part.trim().strip_prefix(prefix.as_str()))
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve a credential into the caller's entitlement.
///
/// - auth disabled: anonymous free-tier user
/// - `auth.api_key`: premium admin service identity
/// - unexpired session token: the owning user
///
/// Returns `Ok(None)` when no credential matches.
pub fn resolve_entitlement(
    auth_config: &AuthConfig,
    db: &DbPool,
    token: Option<&str>,
) -> Result<Option<UserEntitlement>> {
    if !auth_config.enabled {
        return Ok(Some(UserEntitlement::new(service_user_id(), false)));
    }

    let Some(token) = token else {
        return Ok(None);
    };

    if auth_config.api_key.as_deref() == Some(token) {
        return Ok(Some(
            UserEntitlement::new(service_user_id(), true).with_role(Role::Admin),
        ));
    }

    let conn = sg_db::pool::get_conn(db)?;
    let now = Utc::now().to_rfc3339();
    sg_db::queries::auth::session_entitlement(&conn, token, &now)
}

fn request_id_of<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Authentication middleware.
///
/// On success, inserts the resolved [`UserEntitlement`] into request
/// extensions; otherwise answers 401.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> std::result::Result<Response, Response> {
    let token = extract_token(request.headers());
    let request_id = request_id_of(&request);
    let reject = |e: Error| {
        AppError::new(e)
            .with_request_id(request_id.clone())
            .into_response()
    };

    match resolve_entitlement(&ctx.config.auth, &ctx.db, token.as_deref()) {
        Ok(Some(user)) => {
            tracing::trace!(user_id = %user.user_id, premium = user.is_premium, "Authenticated");
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        Ok(None) => Err(reject(Error::Unauthenticated(
            "Authentication required".into(),
        ))),
        Err(e) => Err(reject(e)),
    }
}

/// Admin gate. Must run after [`auth_middleware`]; a request without a
/// resolved entitlement or with a non-admin role gets 403.
pub async fn require_admin(
    request: Request<axum::body::Body>,
    next: Next,
) -> std::result::Result<Response, Response> {
    let user = request.extensions().get::<UserEntitlement>().copied();
    match user {
        Some(user) if user.is_admin() => Ok(next.run(request).await),
        _ => {
            tracing::debug!(
                user_id = ?user.map(|u| u.user_id),
                path = %request.uri().path(),
                "Admin role required"
            );
            Err(AppError::new(Error::Forbidden("Admin role required".into()))
                .with_request_id(request_id_of(&request))
                .into_response())
        }
    }
}
