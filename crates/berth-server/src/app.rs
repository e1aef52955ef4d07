//! Router composition.

use axum::routing::get;
use axum::Router;
use berth_service::BlobService;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers::Registry;
use crate::routes::{blob, root, ucan};

/// Shared state for axum handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BlobService>,
    pub registry: Arc<Registry>,
}

impl AppState {
    /// State dispatching to the blob admission handlers
    pub fn new(service: BlobService) -> Self {
        Self::with_registry(service, Registry::new())
    }

    pub fn with_registry(service: BlobService, registry: Registry) -> Self {
        Self {
            service: Arc::new(service),
            registry: Arc::new(registry),
        }
    }
}

/// Build the node's HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root::info).post(ucan::invoke))
        .route("/blob/:digest", get(blob::get_blob).put(blob::put_blob))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
