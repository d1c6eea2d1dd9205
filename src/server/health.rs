//! Aggregate health endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::state::AppState;

/// Report reachability of both store tiers plus the metric snapshot.
///
/// Always returns 200; the per-tier statuses carry the signal so a
/// degraded process still answers load balancer probes with detail.
pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = tier_status(state.db.ping().await.is_ok());
    let cache = tier_status(state.cache.ping().await.is_ok());

    Json(json!({
        "status": "ok",
        "database": database,
        "cache": cache,
        "metrics": state.metrics.snapshot(),
    }))
}

fn tier_status(up: bool) -> Value {
    if up {
        json!({"status": "up", "message": "healthy"})
    } else {
        json!({"status": "down"})
    }
}
