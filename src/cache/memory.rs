//! In-memory [`FastStore`] implementation.
//!
//! Backs the deterministic integration tests and local development
//! without a Redis instance. A single mutex around the whole state
//! gives `reserve` the same indivisibility the Lua script provides;
//! code TTLs are enforced at consumption time.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{FastStore, ReserveOutcome, RATE_LIMIT_WINDOW};
use crate::error::Result;
use crate::types::{CheckoutRecord, ShowcaseInfo};

#[derive(Default)]
struct SaleState {
    inventory: i64,
    user_purchases: HashMap<String, u32>,
    sold: HashSet<u32>,
    showcase: Option<ShowcaseInfo>,
}

struct StoredCode {
    record: CheckoutRecord,
    expires_at: Instant,
}

struct RateWindow {
    count: i64,
    started_at: Instant,
}

#[derive(Default)]
struct Inner {
    sales: HashMap<String, SaleState>,
    codes: HashMap<String, StoredCode>,
    rate_limits: HashMap<String, RateWindow>,
}

/// Mutex-guarded in-memory hot tier.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed-purchase count for a user, for test assertions.
    #[must_use]
    pub fn user_purchases(&self, sale_id: &str, user_id: &str) -> u32 {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        inner
            .sales
            .get(sale_id)
            .and_then(|sale| sale.user_purchases.get(user_id))
            .copied()
            .unwrap_or(0)
    }

    /// Whether the sold bit is set for a one-based sequence number.
    #[must_use]
    pub fn is_sold(&self, sale_id: &str, sequence: u32) -> bool {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        inner
            .sales
            .get(sale_id)
            .is_some_and(|sale| sale.sold.contains(&sequence))
    }

    /// Number of unexpired codes currently outstanding.
    #[must_use]
    pub fn outstanding_codes(&self) -> usize {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        let now = Instant::now();
        inner
            .codes
            .values()
            .filter(|code| code.expires_at > now)
            .count()
    }
}

#[async_trait]
impl FastStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn init_sale(&self, sale_id: &str, total_items: i64) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.sales.insert(
            sale_id.to_string(),
            SaleState {
                inventory: total_items,
                ..SaleState::default()
            },
        );
        Ok(())
    }

    async fn reserve(
        &self,
        sale_id: &str,
        user_id: &str,
        max_per_user: u32,
    ) -> Result<ReserveOutcome> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        let sale = inner.sales.entry(sale_id.to_string()).or_default();

        let purchased = sale.user_purchases.get(user_id).copied().unwrap_or(0);
        if purchased >= max_per_user {
            return Ok(ReserveOutcome::UserLimitExceeded);
        }

        sale.inventory -= 1;
        if sale.inventory < 0 {
            sale.inventory += 1;
            return Ok(ReserveOutcome::SoldOut);
        }

        Ok(ReserveOutcome::Reserved)
    }

    async fn refund(&self, sale_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.sales.entry(sale_id.to_string()).or_default().inventory += 1;
        Ok(())
    }

    async fn store_code(&self, code: &str, record: &CheckoutRecord, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.codes.insert(
            code.to_string(),
            StoredCode {
                record: record.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn consume_code(&self, code: &str) -> Result<Option<CheckoutRecord>> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        match inner.codes.remove(code) {
            Some(stored) if stored.expires_at > Instant::now() => Ok(Some(stored.record)),
            _ => Ok(None),
        }
    }

    async fn inc_user(&self, sale_id: &str, user_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        let sale = inner.sales.entry(sale_id.to_string()).or_default();
        *sale.user_purchases.entry(user_id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn mark_sold(&self, sale_id: &str, sequence: u32) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner
            .sales
            .entry(sale_id.to_string())
            .or_default()
            .sold
            .insert(sequence);
        Ok(())
    }

    async fn inventory(&self, sale_id: &str) -> Result<i64> {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        Ok(inner.sales.get(sale_id).map_or(0, |sale| sale.inventory))
    }

    async fn set_showcase(&self, sale_id: &str, info: &ShowcaseInfo) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.sales.entry(sale_id.to_string()).or_default().showcase = Some(info.clone());
        Ok(())
    }

    async fn get_showcase(&self, sale_id: &str) -> Result<Option<ShowcaseInfo>> {
        let inner = self.inner.lock().expect("memory store lock poisoned");
        Ok(inner
            .sales
            .get(sale_id)
            .and_then(|sale| sale.showcase.clone()))
    }

    async fn rate_limit_hit(&self, user_id: &str) -> Result<i64> {
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        let now = Instant::now();
        let window = inner
            .rate_limits
            .entry(user_id.to_string())
            .or_insert(RateWindow {
                count: 0,
                started_at: now,
            });

        if now.duration_since(window.started_at) >= RATE_LIMIT_WINDOW {
            window.count = 0;
            window.started_at = now;
        }
        window.count += 1;
        Ok(window.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(user: &str) -> CheckoutRecord {
        CheckoutRecord {
            user_id: user.to_string(),
            item_id: "sale_1_item_000001".to_string(),
            sale_id: "sale_1".to_string(),
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        }
    }

    #[tokio::test]
    async fn reserve_decrements_until_sold_out() {
        let store = MemoryStore::new();
        store.init_sale("sale_1", 2).await.unwrap();

        assert_eq!(
            store.reserve("sale_1", "a", 10).await.unwrap(),
            ReserveOutcome::Reserved
        );
        assert_eq!(
            store.reserve("sale_1", "b", 10).await.unwrap(),
            ReserveOutcome::Reserved
        );
        assert_eq!(
            store.reserve("sale_1", "c", 10).await.unwrap(),
            ReserveOutcome::SoldOut
        );
        assert_eq!(store.inventory("sale_1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reserve_rejects_user_at_cap() {
        let store = MemoryStore::new();
        store.init_sale("sale_1", 100).await.unwrap();

        store.inc_user("sale_1", "alice").await.unwrap();
        store.inc_user("sale_1", "alice").await.unwrap();

        assert_eq!(
            store.reserve("sale_1", "alice", 2).await.unwrap(),
            ReserveOutcome::UserLimitExceeded
        );
        // The rejected attempt must not touch inventory.
        assert_eq!(store.inventory("sale_1").await.unwrap(), 100);
    }

    #[tokio::test]
    async fn code_is_single_consumer() {
        let store = MemoryStore::new();
        store
            .store_code("abc", &record("alice"), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.consume_code("abc").await.unwrap().is_some());
        assert!(store.consume_code("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_code_is_not_consumable() {
        let store = MemoryStore::new();
        store
            .store_code("abc", &record("alice"), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.consume_code("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn init_sale_resets_stale_state() {
        let store = MemoryStore::new();
        store.init_sale("sale_1", 5).await.unwrap();
        store.inc_user("sale_1", "alice").await.unwrap();
        store.mark_sold("sale_1", 3).await.unwrap();

        store.init_sale("sale_1", 5).await.unwrap();
        assert_eq!(store.user_purchases("sale_1", "alice"), 0);
        assert!(!store.is_sold("sale_1", 3));
    }

    #[tokio::test]
    async fn rate_limit_counts_within_window() {
        let store = MemoryStore::new();
        assert_eq!(store.rate_limit_hit("alice").await.unwrap(), 1);
        assert_eq!(store.rate_limit_hit("alice").await.unwrap(), 2);
        assert_eq!(store.rate_limit_hit("bob").await.unwrap(), 1);
    }
}
