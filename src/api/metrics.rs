//! Metrics snapshot endpoint.

use axum::{extract::State, Json};
use serde_json::Value;

use crate::server::AppState;

/// `GET /metrics`: current counter and latency snapshot as JSON.
pub async fn metrics_snapshot(State(state): State<AppState>) -> Json<Value> {
    Json(state.metrics.snapshot())
}
