//! In-process harness: a real router over a temp-dir SQLite database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::response::Response;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use promokit::auth::TokenGenerator;
use promokit::config::ServerConfig;
use promokit::server::{AppState, create_router};
use promokit::store::{SqliteStore, Store};

const BOUNDARY: &str = "promokit-test-boundary";

pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub admin_token: String,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(mut config: ServerConfig) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        config.data_dir = temp_dir.path().to_path_buf();

        let store = SqliteStore::new(config.db_path()).expect("open store");
        store.initialize().expect("initialize store");

        let (token, admin_token) = TokenGenerator::new()
            .expect("argon2 params")
            .issue(true, None, None)
            .expect("issue admin token");
        store.create_token(&token).expect("store admin token");

        let store = Arc::new(store);
        let state = Arc::new(AppState::new(store.clone(), &config));

        Self {
            temp_dir,
            store,
            admin_token,
            router: create_router(state),
        }
    }

    pub async fn response(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.response(request).await;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, body)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Posts `csv` as the `file` field of a multipart form.
    pub async fn upload(&self, uri: &str, token: &str, csv: &str) -> (StatusCode, Value) {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{BOUNDARY}--\r\n"
        );

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("build request");

        self.send(request).await
    }

    /// Creates a user through the admin API and returns (user id, raw token).
    pub async fn create_user(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .post("/api/v1/admin/users", &self.admin_token, json!({ "email": email }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user: {body}");
        let user_id = body["data"]["id"].as_str().expect("user id").to_string();

        let (status, body) = self
            .post(
                &format!("/api/v1/admin/users/{user_id}/tokens"),
                &self.admin_token,
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create token: {body}");
        let token = body["data"]["token"].as_str().expect("token").to_string();

        (user_id, token)
    }

    /// Creates a business owned by the token's user and returns its slug.
    pub async fn create_business(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post("/api/v1/businesses", token, json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create business: {body}");
        body["data"]["slug"].as_str().expect("slug").to_string()
    }
}
