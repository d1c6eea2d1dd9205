//! Checkout endpoint: reserve one unit and issue a code.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutParams {
    pub user_id: Option<String>,
    /// Item id the user claims to want; identification only, a
    /// checkout reserves a unit of inventory, not a specific item.
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub code: String,
}

/// `POST /checkout?user_id=<user>&id=<item>`
pub async fn checkout(
    State(state): State<AppState>,
    Query(params): Query<CheckoutParams>,
) -> Result<Json<CheckoutResponse>, Error> {
    let started = Instant::now();
    state.metrics.incr_checkout_requests();

    let (user_id, item_id) = match (params.user_id, params.id) {
        (Some(user_id), Some(item_id)) if !user_id.is_empty() && !item_id.is_empty() => {
            (user_id, item_id)
        }
        _ => {
            state.metrics.incr_checkout_failed();
            return Err(Error::BadRequest("user_id and id are required".to_string()));
        }
    };

    state.metrics.touch_user(&user_id);

    match state.engine.reserve(&user_id, &item_id).await {
        Ok(code) => {
            state.metrics.incr_checkout_success();
            state.metrics.record_checkout_latency(started.elapsed());
            Ok(Json(CheckoutResponse { code }))
        }
        Err(error) => {
            state.metrics.incr_checkout_failed();
            match &error {
                Error::SoldOut => state.metrics.incr_sold_out_errors(),
                Error::UserLimitExceeded => state.metrics.incr_user_limit_errors(),
                _ => {}
            }
            Err(error)
        }
    }
}
