//! Typed catalog endpoints against the mock catalog.

mod common;

use tokio_util::sync::CancellationToken;

use common::MockCatalog;
use modsync_client::{CatalogClient, CatalogSource};
use modsync_core::config::CatalogConfig;

fn catalog(server: &MockCatalog) -> CatalogClient {
    CatalogClient::from_config(&CatalogConfig::new(format!("{}/", server.base_url))).unwrap()
}

#[tokio::test]
async fn test_project_lookup() {
    let server = MockCatalog::spawn().await;
    let catalog = catalog(&server);

    let project = catalog
        .project("sodium", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(project.name, "Sodium");
    assert_eq!(project.summary.as_deref(), Some("Rendering engine replacement"));
}

#[tokio::test]
async fn test_latest_version_picks_newest_compatible() {
    let server = MockCatalog::spawn().await;
    let catalog = catalog(&server);
    let cancel = CancellationToken::new();

    let latest = catalog
        .latest_version("sodium", "paper-1.21", &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version_number, "0.6.1");

    let none = catalog
        .latest_version("sodium", "forge-1.12", &cancel)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_version_lookup_and_missing_version() {
    let server = MockCatalog::spawn().await;
    let catalog = catalog(&server);
    let cancel = CancellationToken::new();

    let version = catalog.version("sodium", "0.6.1", &cancel).await.unwrap();
    assert_eq!(version.id, "v3");

    let err = catalog.version("sodium", "9.9.9", &cancel).await.unwrap_err();
    assert!(err.is_not_found());
}
