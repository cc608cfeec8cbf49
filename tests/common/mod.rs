//! Shared test harness for integration tests.
//!
//! Provides a `TestHarness` that sets up an in-memory database, a
//! temporary media root, and an `AppContext`, and can serve the app on an
//! ephemeral port for `reqwest`-based tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sg_core::config::Config;
use sg_core::{Category, Track, UserId};
use sg_db::pool::DbPool;
use sg_db::queries::tracks::NewTrack;
use sg_server::context::AppContext;
use sg_storage::{BlobStore, LocalBlobStore};

/// Password used by `create_user`.
pub const PASSWORD: &str = "correct-horse";

pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub media: tempfile::TempDir,
}

impl TestHarness {
    /// Harness with the default config and a local store over a temp dir.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(mut config: Config) -> Self {
        let media = tempfile::tempdir().unwrap();
        config.storage.local.root = media.path().to_path_buf();
        let store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(media.path()));
        Self::with_store(config, store, media)
    }

    pub fn with_store(config: Config, store: Arc<dyn BlobStore>, media: tempfile::TempDir) -> Self {
        let db = sg_db::pool::init_memory_pool().unwrap();
        let ctx = AppContext::new(db.clone(), config, store);
        Self { ctx, db, media }
    }

    /// Serve the app on an ephemeral port.
    pub async fn with_server(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let addr = harness.spawn().await;
        (harness, addr)
    }

    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            sg_server::serve(listener, ctx, std::future::pending()).await.unwrap();
        });
        addr
    }

    pub fn conn(&self) -> sg_db::pool::PooledConnection {
        sg_db::pool::get_conn(&self.db).unwrap()
    }

    pub fn media_path(&self, locator: &str) -> PathBuf {
        self.media.path().join(locator)
    }

    /// Write `bytes` under the media root and register a track for it.
    pub fn add_track(&self, name: &str, bytes: &[u8], is_premium: bool) -> Track {
        self.add_track_in(name, Category::Focus, bytes, is_premium)
    }

    pub fn add_track_in(&self, name: &str, category: Category, bytes: &[u8], is_premium: bool) -> Track {
        let locator = format!("music/{name}.mp3");
        let path = self.media_path(&locator);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let new = NewTrack {
            title: name.into(),
            artist: "Test Artist".into(),
            duration_secs: 60,
            category,
            tags: vec!["test".into()],
            storage_locator: locator,
            size_bytes: Some(bytes.len() as u64),
            mime_type: Some("audio/mpeg".into()),
            cover_image: None,
            is_premium,
        };
        sg_db::queries::tracks::create_track(&self.conn(), &new).unwrap()
    }

    /// Create a user whose password is [`PASSWORD`].
    pub fn create_user(&self, username: &str, is_premium: bool) -> UserId {
        self.create_user_with_role(username, is_premium, "user")
    }

    pub fn create_user_with_role(&self, username: &str, is_premium: bool, role: &str) -> UserId {
        let hash = bcrypt::hash(PASSWORD, 4).unwrap();
        sg_db::queries::users::create_user(&self.conn(), username, &hash, role, is_premium)
            .unwrap()
            .id
    }

    /// Create a user and a session token for it without going through login.
    pub fn session_for(&self, username: &str, is_premium: bool) -> String {
        let user_id = self.create_user(username, is_premium);
        self.issue_token(user_id, username)
    }

    /// Session token for a fresh admin account.
    pub fn admin_session(&self, username: &str) -> String {
        let user_id = self.create_user_with_role(username, false, "admin");
        self.issue_token(user_id, username)
    }

    fn issue_token(&self, user_id: UserId, username: &str) -> String {
        let token = format!("tok-{username}");
        let expires = (Utc::now() + Duration::hours(1)).to_rfc3339();
        sg_db::queries::auth::create_token(&self.conn(), user_id, &token, &expires).unwrap();
        token
    }
}

/// 0, 1, 2, ... wrapping at 251 so every offset is distinguishable.
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Config with auth on and the rate limiter off.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.rate_limit.requests_per_minute = 0;
    config.streaming.chunk_size = 256;
    config
}
