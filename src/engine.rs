//! Two-phase reservation/commit engine.
//!
//! A reservation moves through `none → reserved → committed`, or dies
//! as `expired` (TTL) or `compensated` (code write failed, inventory
//! refunded). The only path to `committed` is an atomic code
//! consumption followed by a per-user increment.
//!
//! The hot path touches only the fast tier: the atomic reserve
//! decision plus one code write on checkout, one code consumption
//! plus one counter increment on purchase. Durable audit writes are
//! spawned off the request task and never block or fail a response.
//!
//! Known hazard: a task dying between `consume_code` and `inc_user`
//! loses the reservation (inventory debited, no purchase recorded).
//! The finalizers retry nothing across that boundary and never revert
//! the consumption.

use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;

use crate::cache::{FastStore, ReserveOutcome};
use crate::config::SaleConfig;
use crate::db::DurableStore;
use crate::error::{Error, Result};
use crate::sale::SaleManager;
use crate::types::{item_sale_id, item_sequence, CheckoutAttempt, CheckoutRecord, Purchase};

/// Reservation/commit protocol over the fast and durable tiers.
pub struct ReservationEngine {
    cache: Arc<dyn FastStore>,
    db: Arc<dyn DurableStore>,
    sales: Arc<SaleManager>,
    config: SaleConfig,
}

impl ReservationEngine {
    #[must_use]
    pub fn new(
        cache: Arc<dyn FastStore>,
        db: Arc<dyn DurableStore>,
        sales: Arc<SaleManager>,
        config: SaleConfig,
    ) -> Self {
        Self {
            cache,
            db,
            sales,
            config,
        }
    }

    /// Reserve one unit against the current sale and issue a checkout
    /// code for it.
    ///
    /// The inventory/user-limit decision is a single atomic operation
    /// in the fast tier. If the code record cannot be written
    /// afterwards, the claimed unit is refunded synchronously before
    /// the error surfaces, so no inventory is lost.
    ///
    /// # Errors
    ///
    /// - [`Error::NoActiveSale`] if no sale is open or the item
    ///   belongs to a different sale
    /// - [`Error::SoldOut`] / [`Error::UserLimitExceeded`] from the
    ///   reserve decision
    /// - [`Error::Internal`] on fast-tier failure
    pub async fn reserve(&self, user_id: &str, item_id: &str) -> Result<String> {
        let Some(sale) = self.sales.current_sale() else {
            return Err(Error::NoActiveSale);
        };
        if let Some(owner) = item_sale_id(item_id) {
            if owner != sale.sale_id {
                return Err(Error::NoActiveSale);
            }
        }

        match self
            .cache
            .reserve(&sale.sale_id, user_id, self.config.max_per_user)
            .await?
        {
            ReserveOutcome::Reserved => {}
            ReserveOutcome::SoldOut => return Err(Error::SoldOut),
            ReserveOutcome::UserLimitExceeded => return Err(Error::UserLimitExceeded),
        }

        let code = generate_code();
        let record = CheckoutRecord {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            sale_id: sale.sale_id.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(self.config.code_ttl.as_secs() as i64),
        };

        if let Err(error) = self
            .cache
            .store_code(&code, &record, self.config.code_ttl)
            .await
        {
            // The unit was claimed but no code exists for it; give it
            // back before surfacing the failure.
            if let Err(refund_error) = self.cache.refund(&sale.sale_id).await {
                tracing::error!(
                    sale_id = %sale.sale_id,
                    error = ?refund_error,
                    "inventory refund failed after code write failure"
                );
            }
            return Err(error);
        }

        self.spawn_attempt_log(record, code.clone());
        Ok(code)
    }

    /// Redeem a checkout code, committing one purchase.
    ///
    /// `consume_code` is single-consumer: exactly one caller gets the
    /// record for any given code. The stored expiry is re-checked
    /// against the clock in case the fast tier returned a record at
    /// the edge of its TTL.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidOrExpiredCode`] if the code is unknown,
    ///   already consumed, or past its TTL
    /// - [`Error::Internal`] on fast-tier failure; if this happens
    ///   after the consumption the reservation is lost
    pub async fn commit(&self, code: &str) -> Result<CheckoutRecord> {
        let Some(record) = self.cache.consume_code(code).await? else {
            return Err(Error::InvalidOrExpiredCode);
        };

        if record.expires_at < Utc::now() {
            return Err(Error::InvalidOrExpiredCode);
        }

        self.cache
            .inc_user(&record.sale_id, &record.user_id)
            .await?;

        self.spawn_finalizers(record.clone(), code.to_string());
        Ok(record)
    }

    /// Append the issued-code audit row off the request task.
    fn spawn_attempt_log(&self, record: CheckoutRecord, code: String) {
        let db = Arc::clone(&self.db);
        tokio::spawn(async move {
            let attempt = CheckoutAttempt {
                sale_id: record.sale_id,
                user_id: record.user_id,
                item_id: record.item_id,
                code,
                status: false,
            };
            if let Err(error) = db.log_checkout_attempt(&attempt).await {
                tracing::warn!(?error, "failed to log checkout attempt");
            }
        });
    }

    /// Run the post-commit side effects off the request task: sold
    /// bitmap, purchase log, and the attempt-status flip.
    fn spawn_finalizers(&self, record: CheckoutRecord, code: String) {
        let cache = Arc::clone(&self.cache);
        let db = Arc::clone(&self.db);
        tokio::spawn(async move {
            if let Some(sequence) = item_sequence(&record.item_id) {
                if let Err(error) = cache.mark_sold(&record.sale_id, sequence).await {
                    tracing::warn!(?error, item_id = %record.item_id, "failed to set sold bit");
                }
            }

            let purchase = Purchase {
                sale_id: record.sale_id.clone(),
                user_id: record.user_id.clone(),
                item_id: record.item_id.clone(),
            };
            if let Err(error) = db.create_purchase(&purchase).await {
                tracing::error!(?error, code = %code, "failed to record purchase");
            }

            if let Err(error) = db.update_checkout_status(&code, true).await {
                tracing::warn!(?error, code = %code, "failed to update checkout attempt");
            }
        });
    }
}

/// Generate a 128-bit random checkout code, hex-encoded to 32 chars.
fn generate_code() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
