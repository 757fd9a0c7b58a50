//! Resilient HTTP client for the remote catalog.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::FutureExt;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use modsync_core::config::CatalogConfig;
use modsync_core::error::AppError;
use modsync_core::result::AppResult;

use crate::backoff::{RetryPolicy, SharedBackoff, parse_retry_after};
use crate::cache::ResponseCache;
use crate::error::RemoteError;
use crate::inflight::InFlight;
use crate::request::ApiRequest;

/// Longest response body excerpt kept in error messages.
const MAX_ERROR_BODY: usize = 256;

/// Successful response of a single attempt.
#[derive(Debug)]
struct RemoteResponse {
    body: Bytes,
    is_json: bool,
}

#[derive(Debug)]
struct ClientInner {
    http: reqwest::Client,
    policy: RetryPolicy,
    backoff: SharedBackoff,
    cache: ResponseCache,
    inflight: InFlight,
    /// Canceled by [`ResilientClient::shutdown`]; stops shared work.
    shutdown: CancellationToken,
}

/// Catalog HTTP client with retries, adaptive backoff, request coalescing
/// and a response cache.
///
/// Cloning is cheap; clones share backoff, cache and in-flight state.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    inner: Arc<ClientInner>,
}

impl ResilientClient {
    /// Build a client from catalog settings.
    pub fn new(config: &CatalogConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let name = HeaderName::from_bytes(config.api_key_header.as_bytes()).map_err(|e| {
                AppError::configuration(format!(
                    "Invalid catalog API key header '{}': {e}",
                    config.api_key_header
                ))
            })?;
            let mut value = HeaderValue::from_str(api_key)
                .map_err(|e| AppError::configuration(format!("Invalid catalog API key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .user_agent(concat!("modsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        let policy = RetryPolicy::from(config);
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                backoff: SharedBackoff::new(policy.backoff_floor, policy.backoff_ceiling),
                policy,
                cache: ResponseCache::new(config.cache_ttl(), config.cache_max_entries),
                inflight: InFlight::default(),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Perform a request and return the response body.
    ///
    /// GET and HEAD requests are answered from the cache when possible and
    /// share one in-flight attempt with concurrent identical calls. When
    /// `cancel` fires the caller gets [`RemoteError::Canceled`] and the
    /// shared backoff is left as it was.
    pub async fn execute(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<Bytes, RemoteError> {
        if cancel.is_cancelled() || self.inner.shutdown.is_cancelled() {
            return Err(RemoteError::Canceled);
        }

        if !request.is_shareable() {
            let inner = &self.inner;
            return tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(canceled(&request)),
                result = inner.run_with_retries(&request) => result.map(|r| r.body),
            };
        }

        let key = request.identity();
        if let Some(body) = self.inner.cache.get(&key).await {
            return Ok(body);
        }

        let (flight, joined) = self.inner.inflight.join_or_start(&key, || {
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            let request = request.clone();
            let task = tokio::spawn(async move {
                let result = inner.cached_or_fetch(&key, &request).await;
                inner.inflight.finish(&key);
                result
            });
            async move {
                task.await.unwrap_or_else(|e| {
                    Err(RemoteError::ServerError {
                        status: None,
                        message: format!("catalog request task failed: {e}"),
                    })
                })
            }
            .boxed()
            .shared()
        });
        if joined {
            debug!(key = %key, "Joined in-flight catalog request");
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(canceled(&request)),
            result = flight => result,
        }
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: reqwest::Url,
        cancel: &CancellationToken,
    ) -> Result<T, RemoteError> {
        let body = self.execute(ApiRequest::get(url), cancel).await?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// Current shared rate-limit backoff.
    pub fn current_backoff(&self) -> Duration {
        self.inner.backoff.current()
    }

    /// Cancel all shared in-flight work and drop cached responses.
    pub fn shutdown(&self) {
        info!(pending = self.inner.inflight.len(), "Shutting down catalog client");
        self.inner.shutdown.cancel();
        self.inner.cache.clear();
    }
}

impl ClientInner {
    async fn cached_or_fetch(&self, key: &str, request: &ApiRequest) -> Result<Bytes, RemoteError> {
        // A flight that finished between the caller's cache miss and this
        // one starting has already stored the body.
        if let Some(body) = self.cache.get(key).await {
            return Ok(body);
        }
        let response = self.run_with_retries(request).await?;
        if response.is_json {
            self.cache.insert(key.to_string(), response.body.clone()).await;
        }
        Ok(response.body)
    }

    /// Bounded retry loop. Only the client shutdown token interrupts it;
    /// individual callers stop waiting instead.
    async fn run_with_retries(&self, request: &ApiRequest) -> Result<RemoteResponse, RemoteError> {
        let mut attempt = 1;
        loop {
            let pre_delay = self.backoff.pre_request_delay();
            if !pre_delay.is_zero() {
                debug!(
                    url = %request.url,
                    delay_ms = pre_delay.as_millis() as u64,
                    "Applying rate-limit backoff"
                );
                self.sleep(pre_delay, request).await?;
            }

            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Err(canceled(request)),
                outcome = self.send_once(request) => outcome,
            };

            match &outcome {
                Err(RemoteError::Canceled) => return outcome,
                Err(RemoteError::RateLimited { .. }) => {
                    let backoff = self.backoff.escalate();
                    warn!(
                        url = %request.url,
                        backoff_ms = backoff.as_millis() as u64,
                        "Catalog is rate limiting, backoff increased"
                    );
                }
                _ => self.backoff.reset(),
            }

            match outcome {
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.retry_delay(attempt, err.retry_after());
                    warn!(
                        url = %request.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying catalog request"
                    );
                    self.sleep(delay, request).await?;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn sleep(&self, delay: Duration, request: &ApiRequest) -> Result<(), RemoteError> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(canceled(request)),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<RemoteResponse, RemoteError> {
        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let is_json = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(is_json_content_type);
            let body = response.bytes().await?;
            return Ok(RemoteResponse { body, is_json });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, Utc::now()));
            return Err(RemoteError::RateLimited { retry_after });
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            status.to_string()
        } else {
            body.chars().take(MAX_ERROR_BODY).collect()
        };

        if status.is_server_error() {
            Err(RemoteError::ServerError {
                status: Some(status.as_u16()),
                message,
            })
        } else {
            Err(RemoteError::ClientError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn canceled(request: &ApiRequest) -> RemoteError {
    debug!(url = %request.url, "Catalog request canceled");
    RemoteError::Canceled
}

fn is_json_content_type(value: &str) -> bool {
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
}
