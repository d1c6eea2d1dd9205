//! Purchase endpoint: redeem a checkout code.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct PurchaseParams {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    pub user_id: String,
    pub item_id: String,
    pub sale_id: String,
}

/// `POST /purchase?code=<hex>`
pub async fn purchase(
    State(state): State<AppState>,
    Query(params): Query<PurchaseParams>,
) -> Result<Json<PurchaseResponse>, Error> {
    let started = Instant::now();
    state.metrics.incr_purchase_requests();

    let Some(code) = params.code.filter(|code| !code.is_empty()) else {
        state.metrics.incr_purchase_failed();
        return Err(Error::BadRequest("code is required".to_string()));
    };

    match state.engine.commit(&code).await {
        Ok(record) => {
            state.metrics.incr_purchase_success();
            state.metrics.incr_items_sold();
            state.metrics.record_purchase_latency(started.elapsed());
            Ok(Json(PurchaseResponse {
                success: true,
                user_id: record.user_id,
                item_id: record.item_id,
                sale_id: record.sale_id,
            }))
        }
        Err(error) => {
            state.metrics.incr_purchase_failed();
            if matches!(error, Error::InvalidOrExpiredCode) {
                state.metrics.incr_code_invalid_errors();
            }
            Err(error)
        }
    }
}
