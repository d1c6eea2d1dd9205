//! HTTP handlers.
//!
//! Thin adapters only: extract parameters, call the engine or the
//! stores, map outcomes to status codes, and emit metrics. No
//! reservation logic lives here.

mod checkout;
mod metrics;
mod purchase;
mod sale;

pub use checkout::checkout;
pub use metrics::metrics_snapshot;
pub use purchase::purchase;
pub use sale::{current_sale, sale_info, sale_status};
