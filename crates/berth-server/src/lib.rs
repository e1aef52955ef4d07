//! # berth-server
//!
//! HTTP surface of a berth node.
//!
//! This crate provides:
//! - The capability binding layer: a registry mapping command names to handlers
//! - `POST /` invocation transport answering with signed receipts
//! - `PUT /blob/:digest` and `GET /blob/:digest` for blob upload and retrieval
//! - `GET /` node identity and build information
//! - `serve`, an axum server loop with graceful shutdown

pub mod app;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod serve;

// Re-export commonly used types
pub use app::{router, AppState};
pub use error::ApiError;
pub use handlers::{Executed, Handler, Registry};
pub use routes::ucan::ResponseContainer;
pub use serve::{serve, shutdown_signal};

/// Repository advertised by `GET /`
pub const REPOSITORY: &str = env!("CARGO_PKG_REPOSITORY");

/// Version advertised by `GET /`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
