//! Local filesystem blob store.
//!
//! Locators are paths relative to the store root. Ranged reads seek to the
//! start offset and cap the handle with `take`, so memory stays bounded
//! regardless of file size.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use sg_core::{ByteRange, Error, Result};

use crate::{expected_len, BlobReader, BlobStore, ResolvedBlob};

/// Guess an audio MIME type from a file extension.
pub fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "wav" => "audio/wav",
        "webm" => "audio/webm",
        _ => return None,
    };
    Some(mime)
}

/// Blob store serving files beneath a root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a locator to a path under the root.
    ///
    /// Absolute paths and parent components are refused so a locator can
    /// never address anything outside the root.
    fn path_for(&self, locator: &str) -> Result<PathBuf> {
        let relative = Path::new(locator.trim());
        let mut path = self.root.clone();
        let mut pushed = false;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    pushed = true;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::not_found("blob", locator));
                }
            }
        }
        if !pushed {
            return Err(Error::not_found("blob", locator));
        }
        Ok(path)
    }
}

fn map_io(locator: &str, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::not_found("blob", locator)
    } else {
        Error::read_failure(format!("{locator}: {err}"))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn resolve(&self, locator: &str) -> Result<ResolvedBlob> {
        let path = self.path_for(locator)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_io(locator, e))?;
        if !metadata.is_file() {
            return Err(Error::not_found("blob", locator));
        }

        Ok(ResolvedBlob {
            locator: locator.to_string(),
            size_bytes: metadata.len(),
            content_type: guess_content_type(locator).map(str::to_string),
        })
    }

    async fn open_reader(
        &self,
        blob: &ResolvedBlob,
        range: Option<ByteRange>,
    ) -> Result<BlobReader> {
        let path = self.path_for(&blob.locator)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_io(&blob.locator, e))?;

        if let Some(r) = range {
            file.seek(std::io::SeekFrom::Start(r.start))
                .await
                .map_err(|e| Error::read_failure(format!("seek failed: {e}")))?;
        }

        // Cap at the resolved length so a file growing mid-stream cannot
        // overrun the advertised Content-Length.
        let limited = file.take(expected_len(blob, range));
        tracing::trace!(locator = %blob.locator, ?range, "Opened local reader");
        Ok(Box::pin(limited))
    }
}
