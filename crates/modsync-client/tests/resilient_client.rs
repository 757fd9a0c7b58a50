//! Behavior of the resilient client against a live mock catalog.

mod common;

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use common::MockCatalog;
use modsync_client::{ApiRequest, RemoteError, ResilientClient};
use modsync_core::config::CatalogConfig;

fn config(server: &MockCatalog) -> CatalogConfig {
    let mut config = CatalogConfig::new(server.base_url.clone());
    config.request_timeout_ms = 1_000;
    config.backoff_floor_ms = 200;
    config
}

async fn get(client: &ResilientClient, server: &MockCatalog, path: &str) -> Result<Bytes, RemoteError> {
    client
        .execute(ApiRequest::get(server.url(path)), &CancellationToken::new())
        .await
}

#[tokio::test]
async fn test_server_errors_are_retried_with_exponential_delay() {
    let server = MockCatalog::spawn().await;
    let client = ResilientClient::new(&config(&server)).unwrap();

    let started = Instant::now();
    let body = get(&client, &server, "/flaky").await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(700));
    assert_eq!(server.hits("/flaky"), 3);
    assert_eq!(body, Bytes::from_static(br#"{"attempt":3}"#));
    assert_eq!(client.current_backoff(), Duration::ZERO);
}

#[tokio::test]
async fn test_exhausted_retries_surface_server_error() {
    let server = MockCatalog::spawn().await;
    let mut config = config(&server);
    config.retry_base_delay_ms = 10;
    let client = ResilientClient::new(&config).unwrap();

    let err = get(&client, &server, "/broken").await.unwrap_err();

    assert_eq!(
        err,
        RemoteError::ServerError {
            status: Some(503),
            message: "maintenance".into()
        }
    );
    assert_eq!(server.hits("/broken"), 3);
}

#[tokio::test]
async fn test_rate_limit_waits_for_retry_after_then_resets_backoff() {
    let server = MockCatalog::spawn().await;
    let mut config = config(&server);
    config.backoff_floor_ms = 500;
    let client = ResilientClient::new(&config).unwrap();

    let started = Instant::now();
    get(&client, &server, "/limited").await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(server.hits("/limited"), 2);
    assert_eq!(client.current_backoff(), Duration::ZERO);

    // A leftover backoff would delay this by at least the 500ms floor.
    let started = Instant::now();
    get(&client, &server, "/fast").await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
async fn test_concurrent_identical_requests_share_one_call() {
    let server = MockCatalog::spawn().await;
    let client = ResilientClient::new(&config(&server)).unwrap();

    let calls = (0..10).map(|_| get(&client, &server, "/slow"));
    let results = futures::future::join_all(calls).await;

    assert_eq!(server.hits("/slow"), 1);
    for result in results {
        assert_eq!(result.unwrap(), Bytes::from_static(br#"{"value":"shared"}"#));
    }
}

#[tokio::test]
async fn test_unsafe_methods_are_not_coalesced() {
    let server = MockCatalog::spawn().await;
    let client = ResilientClient::new(&config(&server)).unwrap();
    let cancel = CancellationToken::new();

    let calls = (0..3).map(|_| {
        client.execute(ApiRequest::new(Method::POST, server.url("/slow")), &cancel)
    });
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(server.hits("/slow"), 3);
}

#[tokio::test]
async fn test_cached_response_expires_after_ttl() {
    let server = MockCatalog::spawn().await;
    let mut config = config(&server);
    config.cache_ttl_seconds = 1;
    let client = ResilientClient::new(&config).unwrap();

    let first = get(&client, &server, "/fast").await.unwrap();
    let second = get(&client, &server, "/fast").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(server.hits("/fast"), 1);

    tokio::time::sleep(Duration::from_millis(1_200)).await;

    let third = get(&client, &server, "/fast").await.unwrap();
    assert_eq!(server.hits("/fast"), 2);
    assert_ne!(first, third);
}

#[tokio::test]
async fn test_non_json_responses_are_not_cached() {
    let server = MockCatalog::spawn().await;
    let client = ResilientClient::new(&config(&server)).unwrap();

    get(&client, &server, "/html").await.unwrap();
    get(&client, &server, "/html").await.unwrap();
    assert_eq!(server.hits("/html"), 2);
}

#[tokio::test]
async fn test_client_errors_fail_immediately() {
    let server = MockCatalog::spawn().await;
    let client = ResilientClient::new(&config(&server)).unwrap();

    let err = get(&client, &server, "/missing").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(server.hits("/missing"), 1);
    assert_eq!(client.current_backoff(), Duration::ZERO);
}

#[tokio::test]
async fn test_slow_response_is_classified_as_timeout() {
    let server = MockCatalog::spawn().await;
    let mut config = config(&server);
    config.request_timeout_ms = 200;
    config.max_attempts = 1;
    let client = ResilientClient::new(&config).unwrap();

    let err = get(&client, &server, "/hang").await.unwrap_err();
    assert_eq!(err, RemoteError::Timeout);
}

#[tokio::test]
async fn test_cancellation_leaves_backoff_unchanged() {
    let server = MockCatalog::spawn().await;
    let mut config = config(&server);
    config.max_attempts = 1;
    let client = ResilientClient::new(&config).unwrap();

    let err = get(&client, &server, "/always-limited").await.unwrap_err();
    assert_eq!(err, RemoteError::RateLimited { retry_after: None });
    assert_eq!(client.current_backoff(), Duration::from_millis(200));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client
        .execute(ApiRequest::get(server.url("/hang")), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, RemoteError::Canceled);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(server.hits("/hang"), 1);
    assert_eq!(client.current_backoff(), Duration::from_millis(200));
}

#[tokio::test]
async fn test_decode_failure_is_reported() {
    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Expected {
        value: String,
    }

    let server = MockCatalog::spawn().await;
    let client = ResilientClient::new(&config(&server)).unwrap();

    let err = client
        .get_json::<Expected>(server.url("/html"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)));
}

#[tokio::test]
async fn test_shutdown_rejects_new_requests() {
    let server = MockCatalog::spawn().await;
    let client = ResilientClient::new(&config(&server)).unwrap();

    client.shutdown();

    let err = get(&client, &server, "/fast").await.unwrap_err();
    assert_eq!(err, RemoteError::Canceled);
    assert_eq!(server.hits("/fast"), 0);
}
