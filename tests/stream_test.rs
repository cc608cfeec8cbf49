//! Integration tests for the byte-range stream endpoint.

mod common;

use common::{sample_bytes, test_config, TestHarness};
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use reqwest::StatusCode;
use sg_core::TrackId;

fn header<'a>(resp: &'a reqwest::Response, name: reqwest::header::HeaderName) -> &'a str {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn get(
    addr: std::net::SocketAddr,
    token: &str,
    track_id: &str,
    range: Option<&str>,
) -> reqwest::Response {
    let mut req = reqwest::Client::new()
        .get(format!("http://{addr}/api/stream/{track_id}"))
        .bearer_auth(token);
    if let Some(range) = range {
        req = req.header(RANGE, range);
    }
    req.send().await.unwrap()
}

#[tokio::test]
async fn full_request_returns_whole_file() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let data = sample_bytes(1000);
    let track = harness.add_track("full", &data, false);
    let token = harness.session_for("free", false);

    let resp = get(addr, &token, &track.id.to_string(), None).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, CONTENT_LENGTH), "1000");
    assert_eq!(header(&resp, ACCEPT_RANGES), "bytes");
    assert_eq!(header(&resp, CONTENT_TYPE), "audio/mpeg");
    assert!(resp.headers().get(CONTENT_RANGE).is_none());
    assert_eq!(resp.bytes().await.unwrap().as_ref(), data.as_slice());
}

#[tokio::test]
async fn bounded_range_returns_partial_content() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let data = sample_bytes(1000);
    let track = harness.add_track("bounded", &data, false);
    let token = harness.session_for("free", false);

    let resp = get(addr, &token, &track.id.to_string(), Some("bytes=100-199")).await;

    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&resp, CONTENT_RANGE), "bytes 100-199/1000");
    assert_eq!(header(&resp, CONTENT_LENGTH), "100");
    assert_eq!(header(&resp, ACCEPT_RANGES), "bytes");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &data[100..200]);
}

#[tokio::test]
async fn open_ended_range_runs_to_end() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let data = sample_bytes(1000);
    let track = harness.add_track("tail", &data, false);
    let token = harness.session_for("free", false);

    let resp = get(addr, &token, &track.id.to_string(), Some("bytes=900-")).await;

    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&resp, CONTENT_RANGE), "bytes 900-999/1000");
    assert_eq!(header(&resp, CONTENT_LENGTH), "100");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &data[900..]);
}

#[tokio::test]
async fn start_past_end_is_unsatisfiable() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let track = harness.add_track("short", &sample_bytes(1000), false);
    let token = harness.session_for("free", false);

    let resp = get(addr, &token, &track.id.to_string(), Some("bytes=5000-")).await;

    assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&resp, CONTENT_RANGE), "bytes */1000");
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_range_bounds() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let data = sample_bytes(1000);
    let track = harness.add_track("huge", &data, false);
    let token = harness.session_for("free", false);
    let id = track.id.to_string();

    let resp = get(addr, &token, &id, Some("bytes=99999999999999999999-")).await;
    assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&resp, CONTENT_RANGE), "bytes */1000");

    let resp = get(addr, &token, &id, Some("bytes=990-99999999999999999999")).await;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&resp, CONTENT_RANGE), "bytes 990-999/1000");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &data[990..]);
}

#[tokio::test]
async fn malformed_range_serves_full_file() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let data = sample_bytes(300);
    let track = harness.add_track("lenient", &data, false);
    let token = harness.session_for("free", false);

    for range in ["bytes=abc-def", "items=0-10", "bytes=0-1,5-6"] {
        let resp = get(addr, &token, &track.id.to_string(), Some(range)).await;
        assert_eq!(resp.status(), StatusCode::OK, "range {range}");
        assert_eq!(resp.bytes().await.unwrap().len(), 300, "range {range}");
    }
}

#[tokio::test]
async fn premium_track_denied_for_free_user_even_with_range() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let track = harness.add_track("gold", &sample_bytes(1000), true);
    let token = harness.session_for("free", false);

    let resp = get(addr, &token, &track.id.to_string(), Some("bytes=0-99")).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.headers().get(CONTENT_RANGE).is_none());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["isPremiumContent"], true);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn premium_track_served_to_premium_user() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let data = sample_bytes(1000);
    let track = harness.add_track("gold", &data, true);
    let token = harness.session_for("paid", true);

    let resp = get(addr, &token, &track.id.to_string(), Some("bytes=0-9")).await;

    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &data[..10]);
}

#[tokio::test]
async fn api_key_acts_as_premium_service() {
    let mut config = test_config();
    config.auth.api_key = Some("service-key".into());
    let (harness, addr) = TestHarness::with_server(config).await;
    let track = harness.add_track("gold", &sample_bytes(64), true);

    let resp = get(addr, "service-key", &track.id.to_string(), None).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await.unwrap().len(), 64);
}

#[tokio::test]
async fn unknown_track_is_not_found() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let token = harness.session_for("free", false);

    let resp = get(addr, &token, &TrackId::new().to_string(), Some("bytes=0-1")).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn missing_blob_is_not_found() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let track = harness.add_track("gone", &sample_bytes(100), false);
    std::fs::remove_file(harness.media_path(&track.storage_locator)).unwrap();
    let token = harness.session_for("free", false);

    let resp = get(addr, &token, &track.id.to_string(), None).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_track_id_is_bad_request() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let token = harness.session_for("free", false);

    let resp = get(addr, &token, "not-a-track", None).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stream_requires_authentication() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let track = harness.add_track("open", &sample_bytes(10), false);

    let resp = reqwest::get(format!("http://{addr}/api/stream/{}", track.id))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_access_when_auth_disabled_is_free_tier() {
    let mut config = test_config();
    config.auth.enabled = false;
    let (harness, addr) = TestHarness::with_server(config).await;
    let free = harness.add_track("free", &sample_bytes(10), false);
    let paid = harness.add_track("paid", &sample_bytes(10), true);

    let ok = reqwest::get(format!("http://{addr}/api/stream/{}", free.id))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let denied = reqwest::get(format!("http://{addr}/api/stream/{}", paid.id))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn repeated_requests_are_identical() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let track = harness.add_track("again", &sample_bytes(1000), false);
    let token = harness.session_for("free", false);

    let first = get(addr, &token, &track.id.to_string(), Some("bytes=250-749")).await;
    let first_range = header(&first, CONTENT_RANGE).to_string();
    let first_body = first.bytes().await.unwrap();

    let second = get(addr, &token, &track.id.to_string(), Some("bytes=250-749")).await;
    assert_eq!(header(&second, CONTENT_RANGE), first_range);
    assert_eq!(second.bytes().await.unwrap(), first_body);
}

#[tokio::test]
async fn head_returns_headers_only() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let track = harness.add_track("peek", &sample_bytes(1000), false);
    let token = harness.session_for("free", false);

    let resp = reqwest::Client::new()
        .head(format!("http://{addr}/api/stream/{}", track.id))
        .bearer_auth(&token)
        .header(RANGE, "bytes=10-19")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&resp, CONTENT_RANGE), "bytes 10-19/1000");
    assert_eq!(header(&resp, ACCEPT_RANGES), "bytes");
}

#[tokio::test]
async fn every_range_of_a_small_file_matches_source() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let data = sample_bytes(12);
    let track = harness.add_track("tiny", &data, false);
    let token = harness.session_for("free", false);
    let id = track.id.to_string();

    for start in 0..data.len() {
        for end in start..data.len() + 2 {
            let resp = get(addr, &token, &id, Some(&format!("bytes={start}-{end}"))).await;
            let last = end.min(data.len() - 1);
            assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT, "{start}-{end}");
            assert_eq!(
                header(&resp, CONTENT_RANGE),
                format!("bytes {start}-{last}/{}", data.len()),
                "{start}-{end}"
            );
            assert_eq!(
                resp.bytes().await.unwrap().as_ref(),
                &data[start..=last],
                "{start}-{end}"
            );
        }
    }
}

#[tokio::test]
async fn aborted_download_does_not_affect_later_requests() {
    let (harness, addr) = TestHarness::with_server(test_config()).await;
    let data = sample_bytes(512 * 1024);
    let track = harness.add_track("long", &data, false);
    let token = harness.session_for("free", false);

    let mut resp = get(addr, &token, &track.id.to_string(), None).await;
    let first = resp.chunk().await.unwrap().unwrap();
    assert!(!first.is_empty());
    drop(resp);

    let again = get(addr, &token, &track.id.to_string(), Some("bytes=0-99")).await;
    assert_eq!(again.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(again.bytes().await.unwrap().as_ref(), &data[..100]);
}
