//! Durable audit tier for sales, items, and purchase history.
//!
//! The [`DurableStore`] trait is the narrow interface the rest of the
//! service sees. Writes on the hot path are fire-and-forget; nothing
//! here is consulted to decide a reservation. The production
//! implementation is `PostgreSQL` ([`PostgresStore`]); the in-memory
//! implementation ([`MemoryStore`]) backs tests.

mod memory;
mod migrations;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CheckoutAttempt, Item, Purchase, Sale};

/// Durable persistence operations.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Reachability probe for the health endpoint.
    async fn ping(&self) -> Result<()>;

    /// Apply pending schema migrations.
    async fn run_migrations(&self) -> Result<()>;

    /// Persist a newly opened sale.
    async fn create_sale(&self, sale: &Sale) -> Result<()>;

    /// Flip a sale's status to `ended`.
    async fn end_sale(&self, sale_id: &str) -> Result<()>;

    /// Persist the item catalogue for a sale in batches.
    async fn create_items(&self, items: &[Item]) -> Result<()>;

    /// First and last `limit` item ids for a sale, ordered by item id.
    async fn showcase_item_ids(
        &self,
        sale_id: &str,
        limit: i64,
    ) -> Result<(Vec<String>, Vec<String>)>;

    /// Append a checkout attempt (issued code, not yet redeemed).
    async fn log_checkout_attempt(&self, attempt: &CheckoutAttempt) -> Result<()>;

    /// Append a committed purchase.
    async fn create_purchase(&self, purchase: &Purchase) -> Result<()>;

    /// Flip the redeemed flag on a previously logged checkout attempt.
    async fn update_checkout_status(&self, code: &str, status: bool) -> Result<()>;

    /// Number of committed purchases recorded for a sale. Used for
    /// end-of-sale reconciliation against the hot tier.
    async fn count_purchases(&self, sale_id: &str) -> Result<i64>;
}
