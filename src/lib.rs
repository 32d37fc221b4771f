//! # Promokit
//!
//! A self-hostable service that cleans uploaded product and sales CSVs,
//! summarizes them per business and drafts marketing campaigns from the
//! result. Usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! promokit = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use promokit::config::ServerConfig;
//! use promokit::server::{AppState, create_router};
//! use promokit::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(&config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), &config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `promokit` binary. Disable with `default-features = false`.

pub mod analytics;
pub mod auth;
pub mod campaign;
pub mod config;
pub mod error;
pub mod ingest;
pub mod scope;
pub mod server;
pub mod store;
pub mod types;
