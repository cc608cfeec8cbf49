//! Application context shared by all route handlers via Axum state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use sg_core::config::Config;
use sg_core::TrackCatalog;
use sg_db::pool::DbPool;
use sg_db::SqliteCatalog;
use sg_storage::BlobStore;

use crate::middleware::rate_limit::{create_limiter, SharedLimiter};

/// Application context shared by all request handlers.
///
/// Cheaply cloneable: it only holds `Arc`s of read-only collaborators, so
/// concurrent streaming sessions never share mutable state.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool (users, tokens).
    pub db: DbPool,
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Track lookup.
    pub catalog: Arc<dyn TrackCatalog>,
    /// Blob store selected from `storage.backend`.
    pub store: Arc<dyn BlobStore>,
    /// Per-client `/api` limiter; `None` when limiting is disabled.
    pub limiter: Option<SharedLimiter>,
    /// Prometheus render handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppContext {
    /// Build a context reading tracks from the SQLite catalog in `db`.
    pub fn new(db: DbPool, config: Config, store: Arc<dyn BlobStore>) -> Self {
        let catalog: Arc<dyn TrackCatalog> = Arc::new(SqliteCatalog::new(db.clone()));
        let limiter = create_limiter(config.rate_limit.requests_per_minute);
        Self {
            db,
            config: Arc::new(config),
            catalog,
            store,
            limiter,
            metrics: None,
        }
    }

    /// Replace the track catalog.
    pub fn with_catalog(mut self, catalog: Arc<dyn TrackCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}
