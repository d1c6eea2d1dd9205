//! Redis-backed [`FastStore`] implementation.
//!
//! The reserve decision runs as a single server-side Lua script so
//! the user-limit check, inventory decrement, and overshoot
//! compensation are indivisible. Sale initialization uses an atomic
//! pipeline so a sale is never observable half-seeded. Code
//! redemption uses `GETDEL`, which makes the code single-consumer
//! without any application-level locking.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use super::{
    active_key, code_key, inventory_key, rate_limit_key, showcase_key, sold_bitmap_key,
    user_purchases_key, FastStore, ReserveOutcome, RATE_LIMIT_WINDOW, SALE_KEY_TTL,
};
use crate::error::{Error, Result};
use crate::types::{CheckoutRecord, ShowcaseInfo};

/// Atomic reserve decision, in order: reject at the user cap without
/// touching state, decrement inventory, and increment back on
/// overshoot. Returns a status string consumed by [`RedisStore::reserve`].
const RESERVE_SCRIPT: &str = r"
    local inventory_key = KEYS[1]
    local user_key = KEYS[2]
    local user_id = ARGV[1]
    local max_per_user = tonumber(ARGV[2])

    local user_count = redis.call('HGET', user_key, user_id)
    if user_count and tonumber(user_count) >= max_per_user then
        return 'user_limit_exceeded'
    end

    local remaining = redis.call('DECR', inventory_key)
    if remaining < 0 then
        redis.call('INCR', inventory_key)
        return 'sold_out'
    end

    return 'reserved'
";

/// Redis client for the hot tier.
///
/// Uses a [`ConnectionManager`], which multiplexes requests over an
/// automatically reconnecting connection; concurrent tasks clone the
/// manager handle instead of checking connections out of a pool.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    reserve_script: Script,
}

impl RedisStore {
    /// Connect to Redis and verify reachability.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server does not
    /// answer an initial PING.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(Error::from)?;
        let conn = ConnectionManager::new(client).await.map_err(Error::from)?;

        let store = Self {
            conn,
            reserve_script: Script::new(RESERVE_SCRIPT),
        };
        store.ping().await?;

        tracing::info!("connected to redis");
        Ok(store)
    }
}

#[async_trait]
impl FastStore for RedisStore {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn init_sale(&self, sale_id: &str, total_items: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let ttl = SALE_KEY_TTL.as_secs();

        let _: () = redis::pipe()
            .atomic()
            .set_ex(inventory_key(sale_id), total_items, ttl)
            .set_ex(active_key(sale_id), "1", ttl)
            .del(user_purchases_key(sale_id))
            .del(sold_bitmap_key(sale_id))
            .query_async(&mut conn)
            .await?;

        tracing::info!(sale_id, total_items, "initialized sale in cache");
        Ok(())
    }

    async fn reserve(
        &self,
        sale_id: &str,
        user_id: &str,
        max_per_user: u32,
    ) -> Result<ReserveOutcome> {
        let mut conn = self.conn.clone();

        let status: String = self
            .reserve_script
            .key(inventory_key(sale_id))
            .key(user_purchases_key(sale_id))
            .arg(user_id)
            .arg(max_per_user)
            .invoke_async(&mut conn)
            .await?;

        match status.as_str() {
            "reserved" => Ok(ReserveOutcome::Reserved),
            "sold_out" => Ok(ReserveOutcome::SoldOut),
            "user_limit_exceeded" => Ok(ReserveOutcome::UserLimitExceeded),
            other => Err(Error::Internal(anyhow::anyhow!(
                "unexpected reserve script result: {other}"
            ))),
        }
    }

    async fn refund(&self, sale_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.incr(inventory_key(sale_id), 1).await?;
        Ok(())
    }

    async fn store_code(&self, code: &str, record: &CheckoutRecord, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(record)?;
        let _: () = conn
            .set_ex(code_key(code), payload, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn consume_code(&self, code: &str) -> Result<Option<CheckoutRecord>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get_del(code_key(code)).await?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn inc_user(&self, sale_id: &str, user_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.hincr(user_purchases_key(sale_id), user_id, 1).await?;
        Ok(())
    }

    async fn mark_sold(&self, sale_id: &str, sequence: u32) -> Result<()> {
        if sequence == 0 {
            return Err(Error::Internal(anyhow::anyhow!(
                "item sequence numbers are one-based"
            )));
        }
        let mut conn = self.conn.clone();
        // The bitmap is zero-indexed; sequences start at one.
        let offset = (sequence - 1) as usize;
        let _: () = conn.setbit(sold_bitmap_key(sale_id), offset, true).await?;
        Ok(())
    }

    async fn inventory(&self, sale_id: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let remaining: Option<i64> = conn.get(inventory_key(sale_id)).await?;
        Ok(remaining.unwrap_or(0))
    }

    async fn set_showcase(&self, sale_id: &str, info: &ShowcaseInfo) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(info)?;
        let _: () = conn
            .set_ex(showcase_key(sale_id), payload, SALE_KEY_TTL.as_secs())
            .await?;
        Ok(())
    }

    async fn get_showcase(&self, sale_id: &str) -> Result<Option<ShowcaseInfo>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(showcase_key(sale_id)).await?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn rate_limit_hit(&self, user_id: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let key = rate_limit_key(user_id);

        let count: i64 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: bool = conn.expire(&key, RATE_LIMIT_WINDOW.as_secs() as i64).await?;
        }
        Ok(count)
    }
}
