//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, auth, blob storage, and streaming. Every
//! section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub streaming: StreamingConfig,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Fill object-store credentials from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Like [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// injectable lookup. Values already present in the file are kept.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let object = &mut self.storage.object;
        if object.access_key_id.is_none() {
            object.access_key_id = lookup("AWS_ACCESS_KEY_ID");
        }
        if object.secret_access_key.is_none() {
            object.secret_access_key = lookup("AWS_SECRET_ACCESS_KEY");
        }
        if object.bucket.is_empty() {
            if let Some(bucket) = lookup("AWS_BUCKET_NAME") {
                object.bucket = bucket;
            }
        }
        if let Some(region) = lookup("AWS_REGION") {
            object.region = region;
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if !self.auth.enabled {
            warnings.push(
                "auth is disabled; every request is treated as a free-tier anonymous user".into(),
            );
        }

        if self.streaming.chunk_size == 0 {
            warnings.push(format!(
                "streaming.chunk_size is 0; using {DEFAULT_CHUNK_SIZE}"
            ));
        }

        if self.storage.backend == StorageBackend::Object {
            let object = &self.storage.object;
            if object.bucket.is_empty() {
                warnings.push("storage.object.bucket is empty".into());
            }
            if object.access_key_id.is_some() != object.secret_access_key.is_some() {
                warnings.push(
                    "storage.object credentials are incomplete; requests will be unsigned".into(),
                );
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            db_path: PathBuf::from("./data/soundgate.db"),
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    /// Static bearer token for service access; grants premium entitlement.
    pub api_key: Option<String>,
    pub session_timeout_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            session_timeout_hours: 24,
        }
    }
}

/// Which blob store backend serves track bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Object,
}

/// Blob storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local: LocalStorageConfig,
    pub object: ObjectStorageConfig,
}

/// Local filesystem backend: locators are paths relative to `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStorageConfig {
    pub root: PathBuf,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./uploads/music"),
        }
    }
}

/// S3-compatible object store backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStorageConfig {
    /// Base URL, e.g. `http://minio:9000`. Empty means the AWS regional
    /// endpoint for `region`.
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Address buckets as `endpoint/bucket/key` instead of `bucket.endpoint/key`.
    pub path_style: bool,
    pub request_timeout_secs: u64,
}

impl ObjectStorageConfig {
    /// The configured endpoint, or `https://s3.{region}.amazonaws.com`.
    pub fn effective_endpoint(&self) -> String {
        match self.endpoint.trim() {
            "" => format!("https://s3.{}.amazonaws.com", self.region.trim()),
            endpoint => endpoint.to_string(),
        }
    }
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: String::new(),
            region: "us-east-1".into(),
            access_key_id: None,
            secret_access_key: None,
            path_style: true,
            request_timeout_secs: 30,
        }
    }
}

/// Default read size for body chunks.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Streaming response settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub chunk_size: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StreamingConfig {
    /// The configured chunk size, or the default when unset.
    pub fn effective_chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }
}

/// Request rate limiting for `/api` routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Allowed requests per minute across all clients; `0` disables limiting.
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 300,
        }
    }
}
