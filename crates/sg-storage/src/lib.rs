//! sg-storage: byte-addressable blob stores for track audio.
//!
//! A [`BlobStore`] turns a track's opaque storage locator into a size and a
//! reader over any inclusive byte range. Two backends share the contract:
//!
//! - [`LocalBlobStore`]: files under a root directory.
//! - [`ObjectBlobStore`]: an S3-compatible bucket, fetched with native HTTP
//!   range requests.
//!
//! [`build_store`] picks one from configuration so the streaming path never
//! needs to know which is in use.

pub mod local;
pub mod object;
pub mod sigv4;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use sg_core::config::{StorageBackend, StorageConfig};
use sg_core::{ByteRange, Result};

pub use local::LocalBlobStore;
pub use object::ObjectBlobStore;

/// An open byte source. Dropping it releases the underlying handle.
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

/// A locator that has been checked to exist, with its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBlob {
    pub locator: String,
    pub size_bytes: u64,
    /// MIME type reported or guessed by the backend, if any.
    pub content_type: Option<String>,
}

/// Resolve locators and open readers over them.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend name for logs ("local", "object").
    fn backend(&self) -> &'static str;

    /// Check that `locator` exists and report its size.
    ///
    /// Fails with `NotFound` for a missing blob and `ReadFailure` for any
    /// other I/O or origin error.
    async fn resolve(&self, locator: &str) -> Result<ResolvedBlob>;

    /// Open a reader over the whole blob (`None`) or exactly the bytes of
    /// `range`. The reader never yields more than the requested length.
    async fn open_reader(&self, blob: &ResolvedBlob, range: Option<ByteRange>)
        -> Result<BlobReader>;
}

/// Build the configured blob store.
pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Local => Arc::new(LocalBlobStore::new(&config.local.root)),
        StorageBackend::Object => Arc::new(ObjectBlobStore::new(&config.object)?),
    };
    tracing::info!(backend = store.backend(), "Blob store initialized");
    Ok(store)
}

/// Number of bytes a reader will yield for `range` over `blob`.
pub fn expected_len(blob: &ResolvedBlob, range: Option<ByteRange>) -> u64 {
    range.map_or(blob.size_bytes, |r| r.len())
}
