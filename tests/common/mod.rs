//! Shared helpers for the Web API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use filevault::config::WebConfig;
use filevault::file::FileStorage;
use filevault::store::{DatabaseStorage, Storage};
use filevault::web::{create_app, AppState, RateLimitState};
use filevault::Database;

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";
pub const PASSWORD: &str = "password123";

/// A router under test plus the blob directory backing it.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<dyn Storage>,
    pub blobs_dir: TempDir,
}

/// Create a test configuration.
pub fn create_test_config() -> WebConfig {
    WebConfig {
        jwt_secret: JWT_SECRET.to_string(),
        login_rate_limit: 100,
        api_rate_limit: 1000,
        ..WebConfig::default()
    }
}

/// App over an in-memory SQLite database with default limits.
pub async fn create_test_app() -> TestApp {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    create_test_app_with(Arc::new(DatabaseStorage::new(db)), |state| state).await
}

/// App over `storage`, with `configure` applied to the state.
pub async fn create_test_app_with(
    storage: Arc<dyn Storage>,
    configure: impl FnOnce(AppState) -> AppState,
) -> TestApp {
    create_test_app_with_config(storage, &create_test_config(), configure).await
}

pub async fn create_test_app_with_config(
    storage: Arc<dyn Storage>,
    config: &WebConfig,
    configure: impl FnOnce(AppState) -> AppState,
) -> TestApp {
    let blobs_dir = TempDir::new().expect("Failed to create blob dir");
    let blobs = FileStorage::new(blobs_dir.path()).expect("Failed to create file storage");

    let state = configure(AppState::new(storage.clone(), blobs, &config.jwt_secret));
    let rate_limits = Arc::new(RateLimitState::new(
        config.login_rate_limit,
        config.api_rate_limit,
    ));

    let router = create_app(Arc::new(state), rate_limits, config);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        storage,
        blobs_dir,
    }
}

/// Register a user and return the response body.
pub async fn register_user(server: &TestServer, username: &str) -> Value {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "password": PASSWORD,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// Register a user and return their access token.
pub async fn register_and_token(server: &TestServer, username: &str) -> String {
    access_token(&register_user(server, username).await)
}

pub fn access_token(body: &Value) -> String {
    body["data"]["access_token"]
        .as_str()
        .expect("access_token missing")
        .to_string()
}

pub fn user_id(body: &Value) -> i64 {
    body["data"]["user"]["id"].as_i64().expect("user id missing")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Upload `content` as `filename`, optionally into a folder.
pub async fn upload(
    server: &TestServer,
    token: &str,
    filename: &str,
    mime_type: &str,
    content: &[u8],
    folder_id: Option<i64>,
) -> TestResponse {
    let mut form = MultipartForm::new().add_part(
        "file",
        Part::bytes(content.to_vec())
            .file_name(filename)
            .mime_type(mime_type),
    );
    if let Some(id) = folder_id {
        form = form.add_text("folder_id", id.to_string());
    }

    server
        .post("/api/files/upload")
        .add_header(AUTHORIZATION, bearer(token))
        .multipart(form)
        .await
}

/// Create a folder and return its id.
pub async fn create_folder(
    server: &TestServer,
    token: &str,
    name: &str,
    parent_id: Option<i64>,
) -> i64 {
    let response = server
        .post("/api/folders")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({ "name": name, "parent_id": parent_id }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["data"]["id"]
        .as_i64()
        .expect("folder id missing")
}

/// GET the caller's storage usage.
pub async fn storage_used(server: &TestServer, token: &str) -> i64 {
    let response = server
        .get("/api/users/storage")
        .add_header(AUTHORIZATION, bearer(token))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["used"]
        .as_i64()
        .expect("used missing")
}
