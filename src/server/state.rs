//! Shared application state.
//!
//! All process-wide collaborators are constructed once in `main` and
//! injected here; handlers reach them through the axum state
//! extractor. Nothing in the crate uses global statics.

use std::sync::Arc;

use crate::cache::FastStore;
use crate::config::Config;
use crate::db::DurableStore;
use crate::engine::ReservationEngine;
use crate::metrics::Metrics;
use crate::sale::SaleManager;

/// State shared across all HTTP handlers. Cloned per request; every
/// field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<dyn FastStore>,
    pub db: Arc<dyn DurableStore>,
    pub sales: Arc<SaleManager>,
    pub engine: Arc<ReservationEngine>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        cache: Arc<dyn FastStore>,
        db: Arc<dyn DurableStore>,
        sales: Arc<SaleManager>,
        engine: Arc<ReservationEngine>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            cache,
            db,
            sales,
            engine,
            metrics,
        }
    }
}
