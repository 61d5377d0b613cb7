// HTTP routes: informational root page, version, metrics scrape path

mod http;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::metrics::Metrics;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) metrics: Metrics,
    pub(crate) metrics_path: String,
}

/// Read-only view of the published metric sets.
pub fn app(metrics: Metrics, metrics_path: &str) -> Router {
    let state = AppState {
        metrics,
        metrics_path: metrics_path.to_string(),
    };
    Router::new()
        .route("/", get(http::root_handler)) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(metrics_path, get(http::metrics_handler)) // GET /metrics
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
