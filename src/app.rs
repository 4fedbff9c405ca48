use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::page;
use crate::provider::ImageGenerator;
use crate::transform::{self, TRANSFORM_PATH};

/// Shared, read-only handler state. The generator is built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn ImageGenerator>,
    body_limit: usize,
}

impl AppState {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            generator,
            body_limit: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit;

    Router::new()
        .route("/", get(page::index))
        .route("/camera", get(page::index))
        .route(
            TRANSFORM_PATH,
            post(transform::sketch_to_image).fallback(transform::method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
