//! Prometheus metrics endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use coresim_common::SimMetrics;

/// Port of the metrics listener.
pub const METRICS_PORT: u16 = 9090;

/// Builds the metrics router exposing `GET /metrics`.
pub fn metrics_router(metrics: Arc<SimMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<Arc<SimMetrics>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
}
