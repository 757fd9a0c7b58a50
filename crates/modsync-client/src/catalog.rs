//! Typed catalog API on top of [`ResilientClient`].

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use modsync_core::config::CatalogConfig;
use modsync_core::error::AppError;
use modsync_core::result::AppResult;

use crate::client::ResilientClient;
use crate::error::RemoteError;

/// A project (mod) listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProject {
    /// Catalog project identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub summary: Option<String>,
}

/// A published version of a catalog project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVersion {
    /// Catalog version identifier.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Version string as installed on servers (e.g. `1.4.2`).
    pub version_number: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
}

/// Read access to the remote catalog.
///
/// Work functions depend on this trait rather than on HTTP so they can be
/// exercised against a fixture catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync + fmt::Debug + 'static {
    /// Look up a project.
    async fn project(
        &self,
        project_id: &str,
        cancel: &CancellationToken,
    ) -> Result<CatalogProject, RemoteError>;

    /// Versions of a project compatible with `server_id`.
    async fn versions(
        &self,
        project_id: &str,
        server_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CatalogVersion>, RemoteError>;

    /// Look up one version by its version number.
    async fn version(
        &self,
        project_id: &str,
        version_number: &str,
        cancel: &CancellationToken,
    ) -> Result<CatalogVersion, RemoteError>;

    /// Newest version compatible with `server_id`, if any.
    async fn latest_version(
        &self,
        project_id: &str,
        server_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<CatalogVersion>, RemoteError> {
        let versions = self.versions(project_id, server_id, cancel).await?;
        Ok(versions.into_iter().max_by(|a, b| {
            a.published_at
                .cmp(&b.published_at)
                .then_with(|| a.id.cmp(&b.id))
        }))
    }
}

/// HTTP implementation of [`CatalogSource`].
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: ResilientClient,
    base_url: Url,
}

impl CatalogClient {
    /// Create a catalog client over an existing resilient client.
    pub fn new(client: ResilientClient, base_url: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            AppError::configuration(format!("Invalid catalog base URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::configuration(format!(
                "Catalog base URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Build the resilient client and catalog client from settings.
    pub fn from_config(config: &CatalogConfig) -> AppResult<Self> {
        Self::new(ResilientClient::new(config)?, &config.base_url)
    }

    /// The underlying resilient client.
    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn project(
        &self,
        project_id: &str,
        cancel: &CancellationToken,
    ) -> Result<CatalogProject, RemoteError> {
        let url = self.endpoint(&["projects", project_id]);
        self.client.get_json(url, cancel).await
    }

    async fn versions(
        &self,
        project_id: &str,
        server_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CatalogVersion>, RemoteError> {
        let mut url = self.endpoint(&["projects", project_id, "versions"]);
        url.query_pairs_mut().append_pair("server", server_id);
        self.client.get_json(url, cancel).await
    }

    async fn version(
        &self,
        project_id: &str,
        version_number: &str,
        cancel: &CancellationToken,
    ) -> Result<CatalogVersion, RemoteError> {
        let url = self.endpoint(&["projects", project_id, "versions", version_number]);
        self.client.get_json(url, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(base: &str) -> CatalogClient {
        CatalogClient::from_config(&CatalogConfig::new(base)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_and_escapes_segments() {
        let client = catalog("https://catalog.test/api/v2/");
        assert_eq!(
            client.endpoint(&["projects", "sodium", "versions"]).as_str(),
            "https://catalog.test/api/v2/projects/sodium/versions"
        );

        let client = catalog("https://catalog.test/api/v2");
        assert_eq!(
            client.endpoint(&["projects", "a b/c"]).as_str(),
            "https://catalog.test/api/v2/projects/a%20b%2Fc"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = CatalogClient::from_config(&CatalogConfig::new("not a url")).unwrap_err();
        assert_eq!(err.kind, modsync_core::error::ErrorKind::Configuration);

        let err = CatalogClient::from_config(&CatalogConfig::new("mailto:ops@example.com"))
            .unwrap_err();
        assert_eq!(err.kind, modsync_core::error::ErrorKind::Configuration);
    }
}
