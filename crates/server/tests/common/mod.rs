//! Common test utilities for E2E testing.
//!
//! This module provides a test fixture that creates an in-process server
//! backed by a seeded SQLite catalog in a temporary directory.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use videocat_core::config::{
    AuthConfig, CatalogConfig, DatabaseConfig, ServerConfig,
};
use videocat_core::{
    create_authenticator, create_view_accounting, seed_if_empty, AuthMethod, Authenticator,
    CatalogEngine, CatalogStore, Config, PageLimits, SqliteCatalogStore, ViewCounter,
};
use videocat_server::state::AppState;

/// Test fixture for E2E testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_search() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.get("/api/v1/videos/search?q=action").await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Direct access to the catalog behind the router
    pub store: Arc<SqliteCatalogStore>,
    /// Counter shared with the router, used to flush pending views
    pub views: ViewCounter,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
    writer: JoinHandle<()>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a seeded fixture with auth disabled.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = match &test_config.api_key {
            Some(key) => AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(key.clone()),
            },
            None => AuthConfig {
                method: AuthMethod::None,
                api_key: None,
            },
        };

        let config = Config {
            auth,
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path,
                max_connections: 4,
                ..Default::default()
            },
            cache: None,
            catalog: CatalogConfig::default(),
        };

        let authenticator: Arc<dyn Authenticator> =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));

        let store = Arc::new(
            SqliteCatalogStore::open(&config.database)
                .await
                .expect("Failed to open catalog"),
        );
        let dyn_store: Arc<dyn CatalogStore> = Arc::clone(&store) as Arc<dyn CatalogStore>;
        if test_config.seed {
            seed_if_empty(dyn_store.as_ref())
                .await
                .expect("Failed to seed catalog");
        }

        let (views, view_writer) = create_view_accounting(Arc::clone(&dyn_store));
        let writer = tokio::spawn(view_writer.run());

        let engine = CatalogEngine::new(
            dyn_store,
            views.clone(),
            PageLimits::from(&config.catalog),
        );
        let state = Arc::new(AppState::new(config, authenticator, engine, None));

        let router = videocat_server::api::create_router(state);

        Self {
            router,
            store,
            views,
            temp_dir,
            writer,
        }
    }

    /// Wait until every view recorded so far is persisted.
    pub async fn flush_views(&self) {
        self.views.flush().await.expect("View flush failed");
    }

    /// Id of the seeded video with this title.
    pub async fn video_id(&self, title: &str) -> String {
        let response = self.get("/api/v1/videos/search?q=&limit=100").await;
        response.body["videos"]
            .as_array()
            .expect("videos array")
            .iter()
            .find(|v| v["title"] == title)
            .and_then(|v| v["id"].as_str())
            .unwrap_or_else(|| panic!("No video titled {:?}", title))
            .to_string()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a POST request with JSON body and extra headers.
    pub async fn post_with_headers(
        &self,
        path: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        self.request("POST", path, Some(body), headers).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into_owned()))
        };

        TestResponse { status, body }
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Require this key on the internal routes
    pub api_key: Option<String>,
    /// Insert the demo catalog
    pub seed: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            seed: true,
        }
    }
}

impl TestConfig {
    /// Create config with API key auth on the internal routes.
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    /// Create config with an empty catalog.
    pub fn empty() -> Self {
        Self {
            seed: false,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
