//! Request middleware: per-user rate limiting and panic recovery.

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tower_http::catch_panic::ResponseForPanic;

use super::state::AppState;
use crate::error::Error;
use crate::metrics::Metrics;

#[derive(Debug, Deserialize)]
pub(super) struct RateLimitQuery {
    user_id: Option<String>,
}

/// Per-user request budget on the checkout/purchase routes, counted
/// in the fast tier. A limiter outage fails open: losing rate
/// limiting is preferable to blocking the sale.
pub(super) async fn rate_limit(
    State(state): State<AppState>,
    Query(query): Query<RateLimitQuery>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    if let Some(user_id) = query.user_id.as_deref().filter(|id| !id.is_empty()) {
        match state.cache.rate_limit_hit(user_id).await {
            Ok(count) if count > state.config.sale.rate_limit_per_minute => {
                return Err(Error::RateLimited);
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(?error, "rate limiter unavailable");
            }
        }
    }

    Ok(next.run(request).await)
}

/// Converts an uncaught handler panic into a 500 and counts it.
#[derive(Clone)]
pub struct PanicResponder {
    metrics: Arc<Metrics>,
}

impl PanicResponder {
    #[must_use]
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> axum::http::Response<Self::ResponseBody> {
        self.metrics.incr_panics();

        let detail = err
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| err.downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic payload");
        tracing::error!(panic = detail, "handler panicked");

        axum::http::Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"error":"internal error"}"#))
            .expect("static panic response always builds")
    }
}
