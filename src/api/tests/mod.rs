use super::*;
use crate::api::error_response::{INTERNAL_ERROR_BODY, NOT_FOUND_BODY};
use crate::config::{Config, FetcherConfig};
use crate::error::Error;
use crate::feed::FeedReflector;
use crate::fetcher::Fetcher;
use crate::tool::MediaDownloader;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::response::Response;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// Writes `<prefix>.mp3` holding `audio for <uri>`; URIs containing "fail" fail
#[derive(Default)]
struct StubDownloader {
    calls: AtomicUsize,
}

#[async_trait]
impl MediaDownloader for StubDownloader {
    async fn probe(&self) -> crate::Result<String> {
        Ok("stub 1.0".to_string())
    }

    async fn download(&self, uri: &str, output_prefix: &Path) -> crate::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if uri.contains("fail") {
            return Err(Error::DownloadFailed {
                status: "exit status: 1".into(),
                output: "ERROR: unavailable".into(),
            });
        }
        let mut file = output_prefix.as_os_str().to_owned();
        file.push(".mp3");
        tokio::fs::write(file, format!("audio for {uri}")).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

async fn create_test_state(
    sources: Vec<crate::Source>,
) -> (AppState, Arc<StubDownloader>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.fetcher = FetcherConfig {
        data_dir: temp_dir.path().to_path_buf(),
        max_cached_files: 5,
        sources,
        ..Default::default()
    };
    config.feed.request_timeout = Duration::from_secs(5);

    let downloader = Arc::new(StubDownloader::default());
    let fetcher = Fetcher::with_downloader(&config.fetcher, downloader.clone())
        .await
        .unwrap();
    let reflector = FeedReflector::new(&config.feed).unwrap();
    let state = AppState::new(Arc::new(fetcher), Arc::new(reflector), Arc::new(config));
    (state, downloader, temp_dir)
}

async fn get(state: &AppState, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    create_router(state.clone()).oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (state, _, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    let response = get(&state, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_path_is_generic_not_found() {
    let (state, _, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    let response = get(&state, "/nothing/here").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, NOT_FOUND_BODY);
}

#[tokio::test]
async fn test_content_is_downloaded_and_served() {
    let (state, downloader, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    let response = get(&state, "/content/youtube/watch?v=abc").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );
    assert_eq!(
        body_text(response).await,
        "audio for https://www.youtube.com/watch?v=abc"
    );

    let entry = state.fetcher.cache().data_dir().join("youtube__watch?v=abc");
    assert!(entry.is_file());
    assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_content_second_request_is_cache_hit() {
    let (state, downloader, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    for _ in 0..2 {
        // the lease is released once the body is consumed
        let response = tokio::time::timeout(
            Duration::from_secs(5),
            get(&state, "/content/youtube/watch?v=abc"),
        )
        .await
        .expect("request should not wait on a leaked lease");
        assert_eq!(response.status(), StatusCode::OK);
        body_text(response).await;
    }

    assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_content_dropped_body_releases_worker() {
    let (state, _, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    let response = get(&state, "/content/youtube/watch?v=first").await;
    assert_eq!(response.status(), StatusCode::OK);
    drop(response);

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        get(&state, "/content/youtube/watch?v=second"),
    )
    .await
    .expect("dropping the body should release the worker");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_content_range_request() {
    let (state, _, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    let request = Request::builder()
        .uri("/content/youtube/watch?v=abc")
        .header(header::RANGE, "bytes=0-4")
        .body(Body::empty())
        .unwrap();
    let response = create_router(state.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_text(response).await, "audio");
}

#[tokio::test]
async fn test_content_download_failure_is_generic_500() {
    let (state, _, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    let response = get(&state, "/content/youtube/watch?v=fail").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, INTERNAL_ERROR_BODY);

    // the failed task released the worker
    let response = tokio::time::timeout(
        Duration::from_secs(5),
        get(&state, "/content/youtube/watch?v=ok"),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_content_unknown_source_is_not_found() {
    let (state, downloader, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    let response = get(&state, "/content/vimeo/12345").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, NOT_FOUND_BODY);
    assert_eq!(downloader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_content_disabled_source_is_not_found() {
    let (state, downloader, _temp_dir) = create_test_state(vec![]).await;

    let response = get(&state, "/content/youtube/watch?v=abc").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, NOT_FOUND_BODY);
    assert_eq!(downloader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_feed_unknown_source_is_not_found() {
    let (state, _, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    let response = get(&state, "/rss/vimeo/channel/x").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, NOT_FOUND_BODY);
}

#[tokio::test]
async fn test_feed_disabled_source_is_not_found() {
    let (state, _, _temp_dir) = create_test_state(vec![]).await;

    let response = get(&state, "/rss/youtube/feeds/videos.xml?channel_id=x").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_content_after_shutdown_is_unavailable() {
    let (state, _, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;
    state.fetcher.shutdown().await;

    let response = get(&state, "/content/youtube/watch?v=abc").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_server_graceful_shutdown() {
    let (state, _, _temp_dir) = create_test_state(crate::Source::ALL.to_vec()).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, state, async move {
        let _ = stopped.await;
    }));

    let response = reqwest::get(format!("http://{address}/health")).await.unwrap();
    assert!(response.status().is_success());

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap()
        .unwrap();
}
