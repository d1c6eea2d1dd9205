//! Hot-tier store for the reservation protocol.
//!
//! The [`FastStore`] trait is the narrow contract the engine and
//! rotator rely on. The production implementation is Redis-backed
//! ([`RedisStore`]); an in-memory implementation ([`MemoryStore`])
//! with the same atomicity guarantees backs the deterministic tests.
//!
//! # Key layout
//!
//! The layout is shared with operational tooling and must not drift:
//!
//! - `sale:<sale_id>:inventory`: integer counter, TTL 1 h 10 m
//! - `sale:<sale_id>:active`: flag `"1"`, TTL 1 h 10 m
//! - `sale:<sale_id>:user_purchases`: hash of `user_id` to count
//! - `sale:<sale_id>:sold_bitmap`: bitstring indexed by sequence - 1
//! - `sale:<sale_id>:showcase_ids`: JSON showcase payload
//! - `checkout_code:<hex>`: JSON checkout record, TTL 5 m
//! - `rate_limit:<user_id>`: integer, TTL 1 m

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CheckoutRecord, ShowcaseInfo};

/// TTL on per-sale keys: one sale window plus slack for stragglers.
pub(crate) const SALE_KEY_TTL: Duration = Duration::from_secs(70 * 60);

/// Expiry of the per-user rate-limit counter.
pub(crate) const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

pub(crate) fn inventory_key(sale_id: &str) -> String {
    format!("sale:{sale_id}:inventory")
}

pub(crate) fn active_key(sale_id: &str) -> String {
    format!("sale:{sale_id}:active")
}

pub(crate) fn user_purchases_key(sale_id: &str) -> String {
    format!("sale:{sale_id}:user_purchases")
}

pub(crate) fn sold_bitmap_key(sale_id: &str) -> String {
    format!("sale:{sale_id}:sold_bitmap")
}

pub(crate) fn showcase_key(sale_id: &str) -> String {
    format!("sale:{sale_id}:showcase_ids")
}

pub(crate) fn code_key(code: &str) -> String {
    format!("checkout_code:{code}")
}

pub(crate) fn rate_limit_key(user_id: &str) -> String {
    format!("rate_limit:{user_id}")
}

/// Outcome of the atomic reserve decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// One unit of inventory was claimed for the caller.
    Reserved,
    /// Inventory is exhausted; nothing was modified.
    SoldOut,
    /// The user is at the per-sale cap; nothing was modified.
    UserLimitExceeded,
}

/// Atomic hot-tier operations backing the reservation protocol.
///
/// `reserve` is the load-bearing method: the user-limit check, the
/// inventory decrement, and the overshoot compensation must be
/// indivisible from any concurrent caller's perspective. Splitting
/// them into a read followed by a write admits oversell.
#[async_trait]
pub trait FastStore: Send + Sync {
    /// Reachability probe for the health endpoint.
    async fn ping(&self) -> Result<()>;

    /// Seed all per-sale keys in one atomic batch: inventory counter,
    /// active flag, and deletion of any stale per-user counts and
    /// sold bitmap left under a recycled sale id. Partial state must
    /// never be observable.
    async fn init_sale(&self, sale_id: &str, total_items: i64) -> Result<()>;

    /// Atomically decide whether one unit can be reserved for
    /// `user_id`: reject at the cap, decrement inventory, and undo
    /// the decrement if it overshot. The per-user count is NOT
    /// incremented here; that happens on commit.
    async fn reserve(
        &self,
        sale_id: &str,
        user_id: &str,
        max_per_user: u32,
    ) -> Result<ReserveOutcome>;

    /// Return one unit to inventory. Compensation for a reservation
    /// whose code record could not be written.
    async fn refund(&self, sale_id: &str) -> Result<()>;

    /// Write a checkout record under its code with the given TTL.
    async fn store_code(&self, code: &str, record: &CheckoutRecord, ttl: Duration) -> Result<()>;

    /// Atomically read and delete a code record. Exactly one caller
    /// observes `Some` for any given code; `None` means the code was
    /// never issued, already consumed, or expired.
    async fn consume_code(&self, code: &str) -> Result<Option<CheckoutRecord>>;

    /// Increment the committed-purchase count for a user.
    async fn inc_user(&self, sale_id: &str, user_id: &str) -> Result<()>;

    /// Set the sold-bitmap bit for a one-based item sequence number.
    async fn mark_sold(&self, sale_id: &str, sequence: u32) -> Result<()>;

    /// Non-atomic read of the current inventory counter.
    async fn inventory(&self, sale_id: &str) -> Result<i64>;

    /// Cache the showcase payload for a sale.
    async fn set_showcase(&self, sale_id: &str, info: &ShowcaseInfo) -> Result<()>;

    /// Read the cached showcase payload, if present.
    async fn get_showcase(&self, sale_id: &str) -> Result<Option<ShowcaseInfo>>;

    /// Count a request against the user's one-minute budget and
    /// return the new count. The window starts at the first hit.
    async fn rate_limit_hit(&self, user_id: &str) -> Result<i64>;
}
