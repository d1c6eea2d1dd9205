//! Router configuration.
//!
//! The checkout/purchase pair sits behind the per-user rate limiter;
//! everything shares the deadline, panic-recovery, CORS, and trace
//! layers.

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::health::health;
use super::middleware::{rate_limit, PanicResponder};
use super::state::AppState;
use crate::api;

/// Build the complete axum router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE]);

    let purchase_routes = Router::new()
        .route("/checkout", post(api::checkout))
        .route("/purchase", post(api::purchase))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .merge(purchase_routes)
        .route("/sale/current", get(api::current_sale))
        .route("/sale/status", get(api::sale_status))
        .route("/sale/info", get(api::sale_info))
        .route("/health", get(health))
        .route("/metrics", get(api::metrics_snapshot))
        .layer(CatchPanicLayer::custom(PanicResponder::new(
            state.metrics.clone(),
        )))
        .layer(TimeoutLayer::new(state.config.server.request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
