// GET handlers: root page, version, metrics

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use super::AppState;
use crate::version::{NAME, VERSION};

/// GET / — links to the metrics path and shows build information.
pub(super) async fn root_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>
<head><title>{NAME}</title></head>
<body>
<h1>{NAME}</h1>
<p><a href='{path}'>Metrics</a></p>
<ul>
<li>version: {VERSION}</li>
<li>os/arch: {os}/{arch}</li>
</ul>
</body>
</html>
",
        path = state.metrics_path,
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
    ))
}

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET <metrics path> — Prometheus text exposition of the current snapshots.
pub(super) async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "encode_metrics", "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
