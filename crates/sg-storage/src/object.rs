//! S3-compatible object storage blob store.
//!
//! Sizes come from `HEAD`, bytes from `GET` with a native `Range` header, so
//! a ranged stream never downloads more than the requested window. Requests
//! are signed with SigV4 when credentials are configured and sent anonymously
//! otherwise (public buckets).
//!
//! Accepted locators:
//!
//! - `s3://bucket/key`
//! - `https://<bucket>.s3.<region>.amazonaws.com/<key>` (and the path-style
//!   `https://s3.<region>.amazonaws.com/<bucket>/<key>`)
//! - a bare key such as `music/1700000000-rain.mp3`, read from the
//!   configured bucket

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;

use sg_core::config::ObjectStorageConfig;
use sg_core::{ByteRange, Error, Result};

use crate::local::guess_content_type;
use crate::sigv4::{self, Credentials, SigningRequest, UNSIGNED_PAYLOAD};
use crate::{expected_len, BlobReader, BlobStore, ResolvedBlob};

const SERVICE: &str = "s3";

/// Bucket and key of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

/// Blob store reading from an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct ObjectBlobStore {
    client: reqwest::Client,
    endpoint: Url,
    bucket: String,
    region: String,
    credentials: Option<Credentials>,
    path_style: bool,
    timeout: Duration,
}

impl ObjectBlobStore {
    pub fn new(config: &ObjectStorageConfig) -> Result<Self> {
        let endpoint = config.effective_endpoint();
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| Error::Validation(format!("invalid object endpoint {endpoint}: {e}")))?;
        if endpoint.host_str().is_none() {
            return Err(Error::Validation(format!(
                "object endpoint has no host: {endpoint}"
            )));
        }

        let credentials = match (&config.access_key_id, &config.secret_access_key) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some(Credentials {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
            }),
            _ => None,
        };

        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Unexpected(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            credentials,
            path_style: config.path_style,
            timeout,
        })
    }

    /// Work out which bucket and key a locator names.
    pub fn locate(&self, locator: &str) -> Result<ObjectLocation> {
        let locator = locator.trim();
        let not_found = || Error::not_found("blob", locator);

        let (bucket, key) = if let Some(rest) = locator.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').ok_or_else(not_found)?;
            (bucket.to_string(), key.to_string())
        } else if locator.starts_with("http://") || locator.starts_with("https://") {
            let url = Url::parse(locator).map_err(|_| not_found())?;
            let host = url.host_str().ok_or_else(not_found)?;
            let path = urlencoding::decode(url.path().trim_start_matches('/'))
                .map_err(|_| not_found())?
                .into_owned();
            match host.split_once(".s3.") {
                Some((bucket, _)) if host.ends_with(".amazonaws.com") => {
                    (bucket.to_string(), path)
                }
                _ if host.starts_with("s3.") && host.ends_with(".amazonaws.com") => {
                    let (bucket, key) = path.split_once('/').ok_or_else(not_found)?;
                    (bucket.to_string(), key.to_string())
                }
                _ => return Err(not_found()),
            }
        } else {
            (
                self.bucket.clone(),
                locator.trim_start_matches('/').to_string(),
            )
        };

        if bucket.is_empty() || key.is_empty() {
            return Err(not_found());
        }
        Ok(ObjectLocation { bucket, key })
    }

    fn url_for(&self, location: &ObjectLocation) -> Result<Url> {
        let mut url = self.endpoint.clone();
        let key = sigv4::encode_key(&location.key);
        if self.path_style {
            let base = self.endpoint.path().trim_end_matches('/');
            url.set_path(&format!("{base}/{}/{key}", location.bucket));
        } else {
            let host = self.endpoint.host_str().unwrap_or_default();
            url.set_host(Some(&format!("{}.{host}", location.bucket)))
                .map_err(|e| Error::Validation(format!("bucket {}: {e}", location.bucket)))?;
            url.set_path(&format!("/{key}"));
        }
        Ok(url)
    }

    /// Build a request, signed when credentials are available.
    fn request(
        &self,
        method: Method,
        location: &ObjectLocation,
        range: Option<ByteRange>,
    ) -> Result<reqwest::RequestBuilder> {
        let url = self.url_for(location)?;
        let mut builder = self.client.request(method.clone(), url.clone());

        let range_header = range.map(|r| format!("bytes={r}"));
        if let Some(value) = &range_header {
            builder = builder.header("range", value);
        }

        let Some(creds) = &self.credentials else {
            return Ok(builder);
        };

        let now = Utc::now();
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => return Err(Error::Validation(format!("url has no host: {url}"))),
        };
        let mut signed = Vec::with_capacity(3);
        if let Some(value) = &range_header {
            signed.push(("range", value.clone()));
        }
        signed.push(("x-amz-content-sha256", UNSIGNED_PAYLOAD.to_string()));
        signed.push(("x-amz-date", sigv4::amz_date(now)));

        let authorization = sigv4::authorization(
            creds,
            &self.region,
            SERVICE,
            now,
            &SigningRequest {
                method: method.as_str(),
                host: &host,
                canonical_uri: url.path(),
                headers: &signed,
                payload_hash: UNSIGNED_PAYLOAD,
            },
        )?;

        Ok(builder
            .header("x-amz-content-sha256", UNSIGNED_PAYLOAD)
            .header("x-amz-date", sigv4::amz_date(now))
            .header("authorization", authorization))
    }

    async fn send(&self, builder: reqwest::RequestBuilder, locator: &str) -> Result<reqwest::Response> {
        // Bounds the wait for response headers only; the body may stream for
        // much longer.
        match tokio::time::timeout(self.timeout, builder.send()).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(e)) => Err(Error::read_failure(format!("{locator}: {e}"))),
            Err(_) => Err(Error::read_failure(format!(
                "{locator}: no response within {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Interpret a `HEAD` response.
pub fn blob_from_head(
    locator: &str,
    location: &ObjectLocation,
    status: StatusCode,
    headers: &HeaderMap,
) -> Result<ResolvedBlob> {
    if status == StatusCode::NOT_FOUND {
        return Err(Error::not_found("blob", locator));
    }
    if !status.is_success() {
        return Err(Error::read_failure(format!(
            "{locator}: origin returned {status}"
        )));
    }

    let size_bytes = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| Error::read_failure(format!("{locator}: origin sent no size")))?;

    let reported = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.ends_with("/octet-stream"));
    let content_type = reported
        .map(str::to_string)
        .or_else(|| guess_content_type(&location.key).map(str::to_string));

    Ok(ResolvedBlob {
        locator: locator.to_string(),
        size_bytes,
        content_type,
    })
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    fn backend(&self) -> &'static str {
        "object"
    }

    async fn resolve(&self, locator: &str) -> Result<ResolvedBlob> {
        let location = self.locate(locator)?;
        let builder = self.request(Method::HEAD, &location, None)?;
        let resp = self.send(builder, locator).await?;
        blob_from_head(locator, &location, resp.status(), resp.headers())
    }

    async fn open_reader(
        &self,
        blob: &ResolvedBlob,
        range: Option<ByteRange>,
    ) -> Result<BlobReader> {
        let location = self.locate(&blob.locator)?;
        let builder = self.request(Method::GET, &location, range)?;
        let resp = self.send(builder, &blob.locator).await?;

        let expected_status = if range.is_some() {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };
        match resp.status() {
            StatusCode::NOT_FOUND => return Err(Error::not_found("blob", &blob.locator)),
            status if status != expected_status => {
                return Err(Error::read_failure(format!(
                    "{}: origin returned {status}, expected {expected_status}",
                    blob.locator
                )));
            }
            _ => {}
        }

        let len = expected_len(blob, range);
        if let Some(sent) = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
        {
            if sent != len {
                return Err(Error::read_failure(format!(
                    "{}: origin sent {sent} bytes, expected {len}",
                    blob.locator
                )));
            }
        }

        let body = resp.bytes_stream().map_err(std::io::Error::other);
        tracing::trace!(locator = %blob.locator, ?range, "Opened object reader");
        Ok(Box::pin(StreamReader::new(body).take(len)))
    }
}
