//! Shared fixtures for the integration suites
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use logistics_server::auth::JwtConfig;
use logistics_server::core::{Config, ServerState, build_router};
use logistics_server::events::{EmailService, RecordingTransport};

pub struct TestApp {
    pub state: ServerState,
    pub router: Router,
    pub transport: Arc<RecordingTransport>,
    // Held so the data directory outlives the test
    _data_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    let data_dir = tempfile::tempdir().expect("create temp data dir");
    let mut config = Config::with_overrides(data_dir.path().to_string_lossy(), 0);
    config.jwt = JwtConfig {
        secret: "integration-test-secret-key-0123456789".to_string(),
        expiration_minutes: 60,
        issuer: "logistics-server".to_string(),
        audience: "logistics-clients".to_string(),
    };
    tweak(&mut config);

    let transport = Arc::new(RecordingTransport::new());
    let email = EmailService::with_transport(transport.clone());
    let state = ServerState::initialize_with_email(&config, email)
        .await
        .expect("initialize server state");
    state.start_background_tasks();

    TestApp {
        router: build_router(state.clone()),
        state,
        transport,
        _data_dir: data_dir,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> (StatusCode, Vec<u8>) {
        let (status, _headers, bytes) = self
            .request_full(method, uri, token, body, extra_headers)
            .await;
        (status, bytes)
    }

    /// Like [`request`], additionally returning the response headers
    pub async fn request_full(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("read response body")
            .to_vec();
        (status, headers, bytes)
    }

    pub async fn request_json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.request(method, uri, token, body, &[]).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Register a user with the given role, returning (token, refresh_token, user_id)
    pub async fn register(&self, email: &str, role: &str) -> (String, String, i64) {
        let (status, body) = self
            .request_json(
                "POST",
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "name": email.split('@').next().unwrap_or("user"),
                    "email": email,
                    "password": "sup3r-secret-pw",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let data = &body["data"];
        (
            data["token"].as_str().expect("token").to_string(),
            data["refresh_token"]
                .as_str()
                .expect("refresh_token")
                .to_string(),
            data["user"]["id"].as_i64().expect("user id"),
        )
    }

    /// Create a vendor, returning its id
    pub async fn create_vendor(&self, token: &str, email: &str) -> i64 {
        let (status, body) = self
            .request_json(
                "POST",
                "/api/vendors",
                Some(token),
                Some(serde_json::json!({
                    "name": "Test Vendor",
                    "email": email,
                    "city": "Pokhara",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "vendor create failed: {body}");
        body["data"]["id"].as_i64().expect("vendor id")
    }

    /// Create a fare from the hub, returning its id
    pub async fn create_fare(&self, token: &str, to_city: &str, door_price: f64) -> i64 {
        let (status, body) = self
            .request_json(
                "POST",
                "/api/fares",
                Some(token),
                Some(serde_json::json!({
                    "from_city": "Pokhara",
                    "to_city": to_city,
                    "branch_delivery_price": 150.0,
                    "cod_branch_price": 200.0,
                    "door_delivery_price": door_price,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "fare create failed: {body}");
        body["data"]["id"].as_i64().expect("fare id")
    }

    /// Create a warehouse, returning its id
    pub async fn create_warehouse(&self, token: &str, name: &str) -> i64 {
        let (status, body) = self
            .request_json(
                "POST",
                "/api/warehouses",
                Some(token),
                Some(serde_json::json!({
                    "name": name,
                    "city": "Pokhara",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "warehouse create failed: {body}");
        body["data"]["id"].as_i64().expect("warehouse id")
    }
}

/// Poll until `check` passes or the timeout elapses
pub async fn wait_until<F: Fn() -> bool>(check: F, what: &str) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {what}");
}
