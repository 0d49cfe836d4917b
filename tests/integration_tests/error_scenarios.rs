//! Error handling integration tests
//!
//! Covers detail failures in both failure modes, output and listing
//! failures, API-level failures and cancellation.

use fetchr::config::FailureMode;
use fetchr::crawler::Crawler;
use fetchr::error::{Error, ErrorCategory, FetchrErrorTrait};
use fetchr::models::SavedPhoto;
use fetchr::utils::error::{FetchError, PipelineError};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{
    fail_json, mount_details, mount_pages, photo_id, search_page_json, test_config,
};

// ============================================================================
// Detail Failures
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_detail_failure_aborts_run() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("photos.json");
    let mock_server = MockServer::start().await;

    let ids = mount_pages(&mock_server, &[3, 2]).await;
    let failing = ids[2].clone();
    mount_details(&mock_server, &ids, &[failing.as_str()]).await;

    let config = test_config(&mock_server.uri(), &output, 2, FailureMode::Abort);
    let result = Crawler::new(config).unwrap().run().await;

    match result {
        Err(Error::Pipeline(PipelineError::Detail { photo_id, source })) => {
            assert_eq!(photo_id, failing);
            assert!(matches!(source, FetchError::Api { .. }));
            assert_eq!(source.to_string(), "flickr error: Photo not found");
        }
        other => panic!("expected detail failure, got {other:?}"),
    }

    // The array is never closed after a fatal error
    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.starts_with('['));
    assert!(!content.ends_with("]\n"));
    assert!(serde_json::from_str::<Vec<SavedPhoto>>(&content).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_detail_failure_collected() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("photos.json");
    let mock_server = MockServer::start().await;

    let ids = mount_pages(&mock_server, &[3, 2]).await;
    let failing = ids[2].clone();
    mount_details(&mock_server, &ids, &[failing.as_str()]).await;

    let config = test_config(&mock_server.uri(), &output, 2, FailureMode::Collect);
    let summary = Crawler::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.listed, 5);
    assert_eq!(summary.saved, 4);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].photo_id, failing);
    assert!(!summary.is_complete());

    let content = std::fs::read_to_string(&output).unwrap();
    let records: Vec<SavedPhoto> = serde_json::from_str(&content).unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.id != failing));
}

#[tokio::test]
async fn test_every_detail_failing_collected_writes_empty_array() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("photos.json");
    let mock_server = MockServer::start().await;

    let ids = mount_pages(&mock_server, &[2]).await;
    let failing: Vec<&str> = ids.iter().map(String::as_str).collect();
    mount_details(&mock_server, &ids, &failing).await;

    let config = test_config(&mock_server.uri(), &output, 2, FailureMode::Collect);
    let summary = Crawler::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.saved, 0);
    assert_eq!(summary.failed.len(), 2);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "[]\n");
}

#[tokio::test]
async fn test_detail_http_error_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("photos.json");
    let mock_server = MockServer::start().await;

    mount_pages(&mock_server, &[1]).await;

    Mock::given(method("GET"))
        .and(query_param("method", "flickr.photos.getInfo"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &output, 1, FailureMode::Abort);
    let err = Crawler::new(config).unwrap().run().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Pipeline(PipelineError::Detail {
            source: FetchError::Status(500),
            ..
        })
    ));
    assert_eq!(err.category(), ErrorCategory::Network);
}

// ============================================================================
// Output Failures
// ============================================================================

#[tokio::test]
async fn test_unwritable_output_path_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("missing").join("photos.json");
    let mock_server = MockServer::start().await;

    mount_pages(&mock_server, &[2]).await;

    // The file cannot be created, so no detail lookup starts
    Mock::given(method("GET"))
        .and(query_param("method", "flickr.photos.getInfo"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &output, 2, FailureMode::Abort);
    let err = Crawler::new(config).unwrap().run().await.unwrap_err();

    assert!(matches!(err, Error::Pipeline(PipelineError::Io(_))));
    assert_eq!(err.category(), ErrorCategory::Storage);
    assert!(!err.is_recoverable());
    assert!(!output.exists());
}

// ============================================================================
// Listing Failures
// ============================================================================

#[tokio::test]
async fn test_listing_failure_creates_no_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("photos.json");
    let mock_server = MockServer::start().await;

    let first: Vec<String> = (0..2).map(|n| photo_id(1, n)).collect();
    Mock::given(method("GET"))
        .and(query_param("method", "flickr.photos.search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page_json(1, 3, &first)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("method", "flickr.photos.search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    // No detail lookups happen once listing fails
    Mock::given(method("GET"))
        .and(query_param("method", "flickr.photos.getInfo"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &output, 2, FailureMode::Collect);
    let err = Crawler::new(config).unwrap().run().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Pipeline(PipelineError::Listing(FetchError::Status(503)))
    ));
    assert!(err.is_recoverable());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_listing_api_failure() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("photos.json");
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("method", "flickr.photos.search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fail_json(100, "Invalid API Key")))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &output, 2, FailureMode::Abort);
    let err = Crawler::new(config).unwrap().run().await.unwrap_err();

    match err {
        Error::Pipeline(PipelineError::Listing(FetchError::Api { code, message })) => {
            assert_eq!(code, Some(100));
            assert_eq!(message, "Invalid API Key");
        }
        other => panic!("expected API failure, got {other:?}"),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn test_listing_malformed_body() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("photos.json");
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("method", "flickr.photos.search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("jsonFlickrApi({"))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &output, 2, FailureMode::Abort);
    let err = Crawler::new(config).unwrap().run().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Pipeline(PipelineError::Listing(FetchError::Decode(_)))
    ));
    assert_eq!(err.category(), ErrorCategory::Parsing);
}

// ============================================================================
// Configuration and Cancellation
// ============================================================================

#[test]
fn test_missing_credentials_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(
        "http://127.0.0.1:1",
        &temp_dir.path().join("photos.json"),
        2,
        FailureMode::Abort,
    );
    config.flickr.api_key.clear();

    let err = Crawler::new(config).err().unwrap();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_empty_pool_or_queues_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("photos.json");

    let mut config = test_config("http://127.0.0.1:1", &output, 0, FailureMode::Collect);
    assert!(matches!(Crawler::new(config.clone()).err(), Some(Error::Config(_))));

    config.pipeline.workers = 2;
    config.pipeline.intake_capacity = 0;
    assert!(matches!(Crawler::new(config.clone()).err(), Some(Error::Config(_))));

    config.pipeline.intake_capacity = 500;
    config.pipeline.output_capacity = 0;
    assert!(matches!(Crawler::new(config).err(), Some(Error::Config(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abort_handle_cancels_run() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("photos.json");
    let mock_server = MockServer::start().await;

    let ids = mount_pages(&mock_server, &[4]).await;
    for id in &ids {
        Mock::given(method("GET"))
            .and(query_param("method", "flickr.photos.getInfo"))
            .and(query_param("photo_id", id.as_str()))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;
    }

    let config = test_config(&mock_server.uri(), &output, 2, FailureMode::Collect);
    let crawler = Crawler::new(config).unwrap();
    let abort = crawler.abort_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        abort.abort();
    });

    let err = crawler.run().await.unwrap_err();
    assert!(matches!(err, Error::Pipeline(PipelineError::Cancelled)));
    assert_eq!(err.category(), ErrorCategory::Cancelled);
}
