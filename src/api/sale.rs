//! Sale query endpoints: current window, live status, showcase info.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::Error;
use crate::sale::SHOWCASE_LIMIT;
use crate::server::AppState;
use crate::types::ShowcaseInfo;

#[derive(Debug, Serialize)]
pub struct CurrentSaleResponse {
    pub sale_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SaleStatusResponse {
    pub sale_id: String,
    pub remaining_items: i64,
    pub items_sold: i64,
    pub sale_ends_at: DateTime<Utc>,
    pub time_remaining_seconds: i64,
}

#[derive(Debug, Serialize)]
pub struct SaleInfoResponse {
    pub sale_id: String,
    pub total_items: i64,
    pub first_items: Vec<String>,
    pub last_items: Vec<String>,
}

fn no_active_sale(status: StatusCode) -> Response {
    (status, Json(json!({"error": "no active sale"}))).into_response()
}

/// `GET /sale/current`
pub async fn current_sale(State(state): State<AppState>) -> Response {
    let Some(sale) = state.sales.current_sale() else {
        return no_active_sale(StatusCode::NOT_FOUND);
    };

    Json(CurrentSaleResponse {
        sale_id: sale.sale_id,
        start_time: sale.start_time,
        end_time: sale.end_time,
    })
    .into_response()
}

/// `GET /sale/status`
///
/// `items_sold` is derived from the live inventory counter, so it
/// includes outstanding reservations that have not committed yet.
pub async fn sale_status(State(state): State<AppState>) -> Result<Response, Error> {
    let Some(sale) = state.sales.current_sale() else {
        return Ok(no_active_sale(StatusCode::NOT_FOUND));
    };

    let remaining = state.cache.inventory(&sale.sale_id).await?;
    let total = state.config.sale.total_items;

    Ok(Json(SaleStatusResponse {
        sale_id: sale.sale_id,
        remaining_items: remaining,
        items_sold: total - remaining,
        sale_ends_at: sale.end_time,
        time_remaining_seconds: (sale.end_time - Utc::now()).num_seconds().max(0),
    })
    .into_response())
}

/// `GET /sale/info`
///
/// Serves the showcase from the cache, falling back to the durable
/// tier on a miss and backfilling the cache off the request path.
pub async fn sale_info(State(state): State<AppState>) -> Result<Json<SaleInfoResponse>, Error> {
    let Some(sale) = state.sales.current_sale() else {
        return Err(Error::NoActiveSale);
    };

    let showcase = match state.cache.get_showcase(&sale.sale_id).await {
        Ok(Some(info)) => info,
        Ok(None) | Err(_) => {
            tracing::debug!(sale_id = %sale.sale_id, "showcase cache miss, reading durable tier");
            let (first_item_ids, last_item_ids) = state
                .db
                .showcase_item_ids(&sale.sale_id, SHOWCASE_LIMIT)
                .await?;
            let info = ShowcaseInfo {
                first_item_ids,
                last_item_ids,
            };

            let cache = state.cache.clone();
            let sale_id = sale.sale_id.clone();
            let backfill = info.clone();
            tokio::spawn(async move {
                if let Err(error) = cache.set_showcase(&sale_id, &backfill).await {
                    tracing::warn!(?error, %sale_id, "showcase backfill failed");
                }
            });

            info
        }
    };

    Ok(Json(SaleInfoResponse {
        sale_id: sale.sale_id,
        total_items: state.config.sale.total_items,
        first_items: showcase.first_item_ids,
        last_items: showcase.last_item_ids,
    }))
}
