//! The stream responder: turns a track id, the caller's entitlement and an
//! optional `Range` header into a complete HTTP response.
//!
//! Order of operations is fixed. The catalog lookup and the access gate run
//! before the blob store is touched, and the range is validated before a
//! reader is opened. Headers are built once from the resolved size; after
//! that the body can only end early, never change them.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use sg_core::{
    authorize, parse_range, Error, RangeRequest, Result, TrackCatalog, TrackId, UserEntitlement,
};
use sg_storage::{expected_len, BlobStore};

use super::session::{PhaseTracker, SessionPhase, StreamSession};
use crate::context::AppContext;

/// Serves track audio with byte-range support.
#[derive(Clone)]
pub struct StreamResponder {
    catalog: Arc<dyn TrackCatalog>,
    store: Arc<dyn BlobStore>,
    chunk_size: usize,
}

impl StreamResponder {
    pub fn new(
        catalog: Arc<dyn TrackCatalog>,
        store: Arc<dyn BlobStore>,
        chunk_size: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(
            ctx.catalog.clone(),
            ctx.store.clone(),
            ctx.config.streaming.effective_chunk_size(),
        )
    }

    /// Build the response for one stream request.
    ///
    /// With `head_only` the headers are identical but no reader is opened.
    pub async fn respond(
        &self,
        track_id: TrackId,
        user: &UserEntitlement,
        range_header: Option<&str>,
        head_only: bool,
    ) -> Result<Response> {
        let mut phase = PhaseTracker::new(track_id);

        let track = self
            .catalog
            .get_track(track_id)?
            .ok_or_else(|| Error::not_found("track", track_id))?;

        if let Err(denied) = authorize(&track, user).into_result() {
            phase.advance(SessionPhase::Denied);
            metrics::counter!("soundgate_access_denied_total").increment(1);
            tracing::info!(
                track_id = %track_id,
                user_id = %user.user_id,
                reason = %denied,
                "Stream denied"
            );
            return Err(denied);
        }
        phase.advance(SessionPhase::Authorized);

        let blob = self.store.resolve(&track.storage_locator).await?;
        let size = blob.size_bytes;
        if track.size_bytes.is_some_and(|recorded| recorded != size) {
            tracing::debug!(
                track_id = %track_id,
                recorded = track.size_bytes,
                actual = size,
                "Catalog size differs from stored blob; using stored size"
            );
        }

        let range = match parse_range(range_header, size) {
            RangeRequest::NoRange => None,
            RangeRequest::Satisfiable(r) => Some(r),
            RangeRequest::Unsatisfiable => {
                tracing::debug!(
                    track_id = %track_id,
                    range = range_header.unwrap_or_default(),
                    size,
                    "Range not satisfiable"
                );
                return Err(Error::RangeUnsatisfiable { size });
            }
        };
        phase.advance(SessionPhase::RangeEvaluated);

        let length = expected_len(&blob, range);
        let mime = track.effective_mime_type(blob.content_type.as_deref());
        let content_type = HeaderValue::from_str(mime).map_err(|_| {
            Error::Unexpected(format!("track {track_id} has an invalid mime type: {mime:?}"))
        })?;

        let mut builder = Response::builder()
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, length)
            .header(header::ACCEPT_RANGES, "bytes");
        builder = match range {
            Some(r) => builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, r.content_range(size)),
            None => builder.status(StatusCode::OK),
        };

        let body = if head_only {
            Body::empty()
        } else {
            let reader = self.store.open_reader(&blob, range).await?;
            phase.advance(SessionPhase::Responding);
            let session = StreamSession::new(track_id, range, length, reader);
            Body::from_stream(ReaderStream::with_capacity(session, self.chunk_size))
        };

        tracing::info!(
            track_id = %track_id,
            backend = self.store.backend(),
            range = range.map(|r| r.to_string()).as_deref().unwrap_or("full"),
            size,
            length,
            head_only,
            "Streaming track"
        );

        builder
            .body(body)
            .map_err(|e| Error::Unexpected(format!("response build failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};

    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use tokio::io::{AsyncRead, ReadBuf};

    use sg_core::{Category, Track, TrackFilter, UserId};
    use sg_storage::{BlobReader, ResolvedBlob};

    const SIZE: usize = 1000;

    fn source() -> Vec<u8> {
        (0..SIZE).map(|i| (i % 251) as u8).collect()
    }

    struct OneTrack(Track);

    impl TrackCatalog for OneTrack {
        fn get_track(&self, id: TrackId) -> Result<Option<Track>> {
            Ok((id == self.0.id).then(|| self.0.clone()))
        }

        fn list_tracks(&self, _filter: &TrackFilter) -> Result<Vec<Track>> {
            Ok(vec![self.0.clone()])
        }
    }

    #[derive(Default)]
    struct Counters {
        resolves: AtomicUsize,
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    /// In-memory store counting collaborator calls.
    struct MockStore {
        data: Vec<u8>,
        counters: Arc<Counters>,
        fail_after: Option<usize>,
    }

    struct TrackedReader {
        data: io::Cursor<Vec<u8>>,
        fail_at_end: bool,
        counters: Arc<Counters>,
    }

    impl AsyncRead for TrackedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let exhausted = self.data.position() as usize >= self.data.get_ref().len();
            if exhausted && self.fail_at_end {
                return Poll::Ready(Err(io::Error::other("origin reset")));
            }
            Pin::new(&mut self.data).poll_read(cx, buf)
        }
    }

    impl Drop for TrackedReader {
        fn drop(&mut self) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl BlobStore for MockStore {
        fn backend(&self) -> &'static str {
            "mock"
        }

        async fn resolve(&self, locator: &str) -> Result<ResolvedBlob> {
            self.counters.resolves.fetch_add(1, Ordering::SeqCst);
            Ok(ResolvedBlob {
                locator: locator.to_string(),
                size_bytes: self.data.len() as u64,
                content_type: Some("audio/ogg".into()),
            })
        }

        async fn open_reader(
            &self,
            _blob: &ResolvedBlob,
            range: Option<sg_core::ByteRange>,
        ) -> Result<BlobReader> {
            self.counters.opens.fetch_add(1, Ordering::SeqCst);
            let (start, end) = range.map_or((0, self.data.len()), |r| {
                (r.start as usize, r.end as usize + 1)
            });
            let end = self.fail_after.map_or(end, |n| end.min(start + n));
            Ok(Box::pin(TrackedReader {
                data: io::Cursor::new(self.data[start..end].to_vec()),
                fail_at_end: self.fail_after.is_some(),
                counters: self.counters.clone(),
            }))
        }
    }

    struct Fixture {
        responder: StreamResponder,
        counters: Arc<Counters>,
        track: Track,
    }

    fn fixture(is_premium: bool, chunk_size: usize, fail_after: Option<usize>) -> Fixture {
        fixture_for(low_tide(is_premium), chunk_size, fail_after)
    }

    fn low_tide(is_premium: bool) -> Track {
        Track {
            id: TrackId::new(),
            title: "Low Tide".into(),
            artist: "Coastline".into(),
            duration_secs: 60,
            category: Category::Nature,
            tags: vec![],
            storage_locator: "music/low-tide.ogg".into(),
            size_bytes: Some(SIZE as u64),
            mime_type: None,
            cover_image: None,
            is_premium,
            play_count: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn fixture_for(track: Track, chunk_size: usize, fail_after: Option<usize>) -> Fixture {
        let counters = Arc::new(Counters::default());
        let store = MockStore {
            data: source(),
            counters: counters.clone(),
            fail_after,
        };
        Fixture {
            responder: StreamResponder::new(
                Arc::new(OneTrack(track.clone())),
                Arc::new(store),
                chunk_size,
            ),
            counters,
            track,
        }
    }

    fn free_user() -> UserEntitlement {
        UserEntitlement::new(UserId::new(), false)
    }

    fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
        response.headers()[name].to_str().unwrap()
    }

    #[tokio::test]
    async fn full_response_headers_and_body() {
        let f = fixture(false, 64 * 1024, None);
        let response = f
            .responder
            .respond(f.track.id, &free_user(), None, false)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "1000");
        assert_eq!(header_str(&response, header::ACCEPT_RANGES), "bytes");
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "audio/ogg");
        assert!(response.headers().get(header::CONTENT_RANGE).is_none());

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), source().as_slice());
        assert_eq!(f.counters.opens.load(Ordering::SeqCst), 1);
        assert_eq!(f.counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial_response() {
        let f = fixture(false, 64 * 1024, None);
        let response = f
            .responder
            .respond(f.track.id, &free_user(), Some("bytes=100-199"), false)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes 100-199/1000");
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "100");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), &source()[100..200]);
    }

    #[tokio::test]
    async fn open_ended_range() {
        let f = fixture(false, 64 * 1024, None);
        let response = f
            .responder
            .respond(f.track.id, &free_user(), Some("bytes=900-"), false)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes 900-999/1000");
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "100");
    }

    #[tokio::test]
    async fn unknown_track_never_touches_storage() {
        let f = fixture(false, 1024, None);
        let err = f
            .responder
            .respond(TrackId::new(), &free_user(), Some("bytes=0-10"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(f.counters.resolves.load(Ordering::SeqCst), 0);
        assert_eq!(f.counters.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn premium_denial_never_touches_storage() {
        let f = fixture(true, 1024, None);
        for range in [None, Some("bytes=0-99"), Some("bytes=5000-")] {
            let err = f
                .responder
                .respond(f.track.id, &free_user(), range, false)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::PremiumRequired));
        }
        assert_eq!(f.counters.resolves.load(Ordering::SeqCst), 0);
        assert_eq!(f.counters.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn premium_user_is_served() {
        let f = fixture(true, 1024, None);
        let premium = UserEntitlement::new(UserId::new(), true);
        let response = f
            .responder
            .respond(f.track.id, &premium, None, false)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unsatisfiable_range_opens_no_reader() {
        let f = fixture(false, 1024, None);
        let err = f
            .responder
            .respond(f.track.id, &free_user(), Some("bytes=1000-"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RangeUnsatisfiable { size: 1000 }));
        assert_eq!(f.counters.resolves.load(Ordering::SeqCst), 1);
        assert_eq!(f.counters.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_mime_type_fails_before_reader_opens() {
        let mut track = low_tide(false);
        track.mime_type = Some("audio/\nbad".into());
        let f = fixture_for(track, 1024, None);

        for head_only in [false, true] {
            let err = f
                .responder
                .respond(f.track.id, &free_user(), None, head_only)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Unexpected(_)));
        }
        assert_eq!(f.counters.resolves.load(Ordering::SeqCst), 2);
        assert_eq!(f.counters.opens.load(Ordering::SeqCst), 0);
        assert_eq!(f.counters.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn head_only_opens_no_reader() {
        let f = fixture(false, 1024, None);
        let response = f
            .responder
            .respond(f.track.id, &free_user(), Some("bytes=0-9"), true)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "10");
        assert_eq!(f.counters.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn client_disconnect_releases_reader_once() {
        let f = fixture(false, 50, None);
        let response = f
            .responder
            .respond(f.track.id, &free_user(), None, false)
            .await
            .unwrap();
        let mut body = response.into_body();

        let frame = body.frame().await.unwrap().unwrap();
        let data = frame.into_data().unwrap();
        assert_eq!(data.len(), 50);
        assert_eq!(f.counters.closes.load(Ordering::SeqCst), 0);

        // Client goes away: hyper drops the body.
        drop(body);

        assert_eq!(f.counters.opens.load(Ordering::SeqCst), 1);
        assert_eq!(f.counters.closes.load(Ordering::SeqCst), 1);
        assert_eq!(f.counters.resolves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_failure_aborts_without_padding() {
        let f = fixture(false, 64, Some(100));
        let response = f
            .responder
            .respond(f.track.id, &free_user(), None, false)
            .await
            .unwrap();
        // Headers already promise the full size.
        assert_eq!(header_str(&response, header::CONTENT_LENGTH), "1000");

        let mut body = response.into_body();
        let mut received = 0;
        let err = loop {
            match body.frame().await {
                Some(Ok(frame)) => received += frame.into_data().unwrap().len(),
                Some(Err(e)) => break e,
                None => panic!("body ended without error"),
            }
        };
        assert!(!err.to_string().is_empty());
        assert_eq!(received, 100);
        drop(body);

        // No retry: exactly one reader, released once.
        assert_eq!(f.counters.opens.load(Ordering::SeqCst), 1);
        assert_eq!(f.counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn identical_requests_are_identical() {
        let f = fixture(false, 128, None);
        let mut results = Vec::new();
        for _ in 0..2 {
            let response = f
                .responder
                .respond(f.track.id, &free_user(), Some("bytes=10-509"), false)
                .await
                .unwrap();
            let headers = response.headers().clone();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            results.push((headers, body));
        }
        assert_eq!(results[0], results[1]);
    }
}
