use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::user::user_router;
use crate::config::ServerConfig;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub data_dir: PathBuf,
    /// Public base URL for external access, when running behind a proxy.
    pub public_base_url: Option<String>,
    /// Largest accepted CSV upload, in bytes.
    pub max_upload_bytes: usize,
    /// Label put in front of money amounts in campaign plans.
    pub currency: String,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: &ServerConfig) -> Self {
        Self {
            store,
            data_dir: config.data_dir.clone(),
            public_base_url: config.public_base_url.clone(),
            max_upload_bytes: config.max_upload_bytes,
            currency: config.currency.clone(),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", user_router(max_upload_bytes))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
