//! In-process mock catalog server for client tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Default)]
struct MockState {
    hits: Mutex<HashMap<String, usize>>,
}

impl MockState {
    fn hit(&self, path: &str) -> usize {
        let mut hits = self.hits.lock().unwrap();
        let count = hits.entry(path.to_string()).or_default();
        *count += 1;
        *count
    }
}

/// Mock catalog bound to an ephemeral port; aborted on drop.
pub struct MockCatalog {
    pub base_url: String,
    state: Arc<MockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockCatalog {
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(route).with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> reqwest::Url {
        reqwest::Url::parse(&format!("{}{path}", self.base_url)).unwrap()
    }

    /// Number of requests the server has seen for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

impl Drop for MockCatalog {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn route(State(state): State<Arc<MockState>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let hits = state.hit(&path);

    match path.as_str() {
        "/fast" => axum::Json(json!({ "ok": true, "hits": hits })).into_response(),
        "/flaky" if hits <= 2 => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "/flaky" => axum::Json(json!({ "attempt": hits })).into_response(),
        "/limited" if hits == 1 => {
            (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "2")]).into_response()
        }
        "/limited" => axum::Json(json!({ "ok": true })).into_response(),
        "/always-limited" => StatusCode::TOO_MANY_REQUESTS.into_response(),
        "/broken" => (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response(),
        "/missing" => (StatusCode::NOT_FOUND, "no such resource").into_response(),
        "/slow" => {
            tokio::time::sleep(Duration::from_millis(300)).await;
            axum::Json(json!({ "value": "shared" })).into_response()
        }
        "/hang" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            axum::Json(json!({})).into_response()
        }
        "/html" => (
            [(header::CONTENT_TYPE, "text/html")],
            "<html></html>",
        )
            .into_response(),
        "/projects/sodium" => axum::Json(json!({
            "id": "sodium",
            "name": "Sodium",
            "summary": "Rendering engine replacement"
        }))
        .into_response(),
        "/projects/sodium/versions" => {
            let server = uri
                .query()
                .and_then(|q| q.split('&').find_map(|p| p.strip_prefix("server=")))
                .unwrap_or_default();
            if server != "paper-1.21" {
                return axum::Json(json!([])).into_response();
            }
            axum::Json(json!([
                {
                    "id": "v1",
                    "project_id": "sodium",
                    "version_number": "0.5.0",
                    "published_at": "2026-01-10T12:00:00Z"
                },
                {
                    "id": "v3",
                    "project_id": "sodium",
                    "version_number": "0.6.1",
                    "published_at": "2026-03-02T08:30:00Z"
                },
                {
                    "id": "v2",
                    "project_id": "sodium",
                    "version_number": "0.6.0",
                    "published_at": "2026-02-14T09:00:00Z"
                }
            ]))
            .into_response()
        }
        "/projects/sodium/versions/0.6.1" => axum::Json(json!({
            "id": "v3",
            "project_id": "sodium",
            "version_number": "0.6.1",
            "published_at": "2026-03-02T08:30:00Z"
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
