//! Axum router construction.
//!
//! Builds the application router with all route groups and middleware
//! layers.

use axum::http::header;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::auth::login,
        routes::auth::logout,
        routes::auth::auth_status,
        routes::tracks::list_tracks,
        routes::tracks::get_track,
        routes::tracks::update_track,
        routes::tracks::delete_track,
        routes::stream::stream_track,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::auth::LoginRequest,
        routes::auth::AuthResponse,
        routes::auth::AuthStatusResponse,
        routes::tracks::TrackResponse,
        routes::tracks::UpdateTrackRequest,
        sg_core::Category,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
        ]);

    // Auth routes -- always accessible.
    let auth_routes = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/status", get(routes::auth::auth_status));

    // Catalog writes. `route_layer` keeps unmatched methods at 405.
    let admin_track_routes = put(routes::tracks::update_track)
        .delete(routes::tracks::delete_track)
        .route_layer(middleware::from_fn(require_admin));

    // Protected API routes. `get` also answers HEAD.
    let protected_routes = Router::new()
        .route("/tracks", get(routes::tracks::list_tracks))
        .route(
            "/tracks/{id}",
            get(routes::tracks::get_track).merge(admin_track_routes),
        )
        .route("/stream/{track_id}", get(routes::stream::stream_track))
        .layer(middleware::from_fn_with_state(ctx.clone(), auth_middleware));

    let api = auth_routes
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(ctx.clone(), rate_limit_middleware));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    use sg_core::config::Config;
    use sg_storage::LocalBlobStore;

    fn app(config: Config) -> Router {
        let db = sg_db::pool::init_memory_pool().unwrap();
        let ctx = AppContext::new(db, config, Arc::new(LocalBlobStore::new("/nonexistent")));
        build_router(ctx)
    }

    #[tokio::test]
    async fn health_is_open_and_tagged() {
        let response = app(Config::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn protected_routes_require_auth() {
        let response = app(Config::default())
            .oneshot(Request::get("/api/tracks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_track_id_is_bad_request() {
        let mut config = Config::default();
        config.auth.enabled = false;
        let response = app(config)
            .oneshot(
                Request::get("/api/stream/not-a-uuid")
                    .header("x-request-id", "rid-7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["request_id"], "rid-7");
        assert_eq!(body["code"], "validation_error");
    }

    fn status_from(client: &str) -> Request<Body> {
        let addr: std::net::SocketAddr = client.parse().unwrap();
        let mut request = Request::get("/api/auth/status").body(Body::empty()).unwrap();
        request.extensions_mut().insert(axum::extract::ConnectInfo(addr));
        request
    }

    #[tokio::test]
    async fn rate_limit_is_tracked_per_client() {
        let mut config = Config::default();
        config.rate_limit.requests_per_minute = 1;
        let app = app(config);

        let first = app.clone().oneshot(status_from("198.51.100.1:5000")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.clone().oneshot(status_from("198.51.100.1:5001")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app.oneshot(status_from("198.51.100.2:5000")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn track_delete_requires_admin() {
        let mut config = Config::default();
        config.auth.enabled = false;
        let response = app(config)
            .oneshot(
                Request::delete(format!("/api/tracks/{}", sg_core::TrackId::new()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "forbidden");
    }

    #[tokio::test]
    async fn openapi_document_lists_stream_route() {
        let response = app(Config::default())
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/api/stream/{track_id}"].is_object());
    }
}
