//! In-memory [`DurableStore`] implementation for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::DurableStore;
use crate::error::Result;
use crate::types::{CheckoutAttempt, Item, Purchase, Sale};

#[derive(Default)]
struct Inner {
    sales: Vec<Sale>,
    items: Vec<Item>,
    checkout_attempts: Vec<CheckoutAttempt>,
    purchases: Vec<Purchase>,
    ended: Vec<String>,
}

/// Mutex-guarded in-memory audit tier.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses recorded for a sale id, for test assertions.
    #[must_use]
    pub fn sale_status(&self, sale_id: &str) -> Option<String> {
        let inner = self.inner.lock().expect("memory db lock poisoned");
        if inner.ended.iter().any(|ended| ended == sale_id) {
            return Some("ended".to_string());
        }
        inner
            .sales
            .iter()
            .find(|sale| sale.sale_id == sale_id)
            .map(|sale| sale.status.clone())
    }

    /// Number of item rows seeded for a sale.
    #[must_use]
    pub fn item_count(&self, sale_id: &str) -> usize {
        let inner = self.inner.lock().expect("memory db lock poisoned");
        inner
            .items
            .iter()
            .filter(|item| item.sale_id == sale_id)
            .count()
    }

    /// Checkout attempts logged for a code.
    #[must_use]
    pub fn attempts_for_code(&self, code: &str) -> Vec<CheckoutAttempt> {
        let inner = self.inner.lock().expect("memory db lock poisoned");
        inner
            .checkout_attempts
            .iter()
            .filter(|attempt| attempt.code == code)
            .cloned()
            .collect()
    }

    /// All recorded purchases.
    #[must_use]
    pub fn purchases(&self) -> Vec<Purchase> {
        let inner = self.inner.lock().expect("memory db lock poisoned");
        inner.purchases.clone()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn run_migrations(&self) -> Result<()> {
        Ok(())
    }

    async fn create_sale(&self, sale: &Sale) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory db lock poisoned");
        inner.sales.push(sale.clone());
        Ok(())
    }

    async fn end_sale(&self, sale_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory db lock poisoned");
        inner.ended.push(sale_id.to_string());
        Ok(())
    }

    async fn create_items(&self, items: &[Item]) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory db lock poisoned");
        inner.items.extend_from_slice(items);
        Ok(())
    }

    async fn showcase_item_ids(
        &self,
        sale_id: &str,
        limit: i64,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let inner = self.inner.lock().expect("memory db lock poisoned");
        let mut ids: Vec<String> = inner
            .items
            .iter()
            .filter(|item| item.sale_id == sale_id)
            .map(|item| item.item_id.clone())
            .collect();
        ids.sort_unstable();

        let limit = limit.max(0) as usize;
        let first = ids.iter().take(limit).cloned().collect();
        let last = ids.iter().rev().take(limit).cloned().collect();
        Ok((first, last))
    }

    async fn log_checkout_attempt(&self, attempt: &CheckoutAttempt) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory db lock poisoned");
        inner.checkout_attempts.push(attempt.clone());
        Ok(())
    }

    async fn create_purchase(&self, purchase: &Purchase) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory db lock poisoned");
        inner.purchases.push(purchase.clone());
        Ok(())
    }

    async fn update_checkout_status(&self, code: &str, status: bool) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory db lock poisoned");
        for attempt in inner
            .checkout_attempts
            .iter_mut()
            .filter(|attempt| attempt.code == code)
        {
            attempt.status = status;
        }
        Ok(())
    }

    async fn count_purchases(&self, sale_id: &str) -> Result<i64> {
        let inner = self.inner.lock().expect("memory db lock poisoned");
        Ok(inner
            .purchases
            .iter()
            .filter(|purchase| purchase.sale_id == sale_id)
            .count() as i64)
    }
}
