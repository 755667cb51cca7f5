mod health;
mod metrics;
mod generate;
mod page;

use axum::{Router, routing::{get, post}};
use std::sync::Arc;
use crate::state::AppState;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use generate::{client_identity, generate_handler};
pub use page::{backends_handler, code_handler, code_snippet, index_handler, prompt_handler};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/backends", get(backends_handler))
        .route("/api/prompt", get(prompt_handler))
        .route("/api/code", get(code_handler))
        .with_state(state)
}
