//! `PostgreSQL`-backed [`DurableStore`] implementation.
//!
//! All hot-path writes here happen off the request task; latency is
//! not critical, durability is. Item seeding is the one bulk write:
//! 10,000 rows per sale, inserted in batches of 1000 with one
//! transaction per batch so a failed batch never leaves a torn sale
//! half-visible inside itself.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;

use super::{migrations, DurableStore};
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::types::{CheckoutAttempt, Item, Purchase, Sale};

/// Rows per item-insert transaction.
const ITEM_BATCH_SIZE: usize = 1000;

/// Pooled `PostgreSQL` store.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect with the configured pool shape and schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let schema = config.schema.clone();
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .after_connect(move |conn, _meta| {
                let schema = schema.clone();
                Box::pin(async move {
                    if !schema.is_empty() && schema != "public" {
                        let set_path = format!("SET search_path TO \"{schema}\"");
                        conn.execute(set_path.as_str()).await?;
                    }
                    Ok(())
                })
            })
            .connect(&config.url())
            .await?;

        tracing::info!(
            host = %config.host,
            database = %config.database,
            "connected to postgres"
        );
        Ok(Self { pool })
    }

    /// Build a store around an existing pool. Useful for tests that
    /// manage their own database lifecycle.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn create_items_batch(&self, items: &[Item]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            sqlx::query(
                "INSERT INTO items (item_id, sale_id, name, image_url) VALUES ($1, $2, $3, $4)",
            )
            .bind(&item.item_id)
            .bind(&item.sale_id)
            .bind(&item.name)
            .bind(&item.image_url)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl DurableStore for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn run_migrations<'life0, 'async_trait>(
        &'life0 self,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { migrations::run(&self.pool).await })
    }

    async fn create_sale(&self, sale: &Sale) -> Result<()> {
        sqlx::query(
            "INSERT INTO sales (sale_id, start_time, end_time, total_items, status)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&sale.sale_id)
        .bind(sale.start_time)
        .bind(sale.end_time)
        .bind(sale.total_items as i32)
        .bind(&sale.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn end_sale(&self, sale_id: &str) -> Result<()> {
        sqlx::query("UPDATE sales SET status = 'ended' WHERE sale_id = $1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_items(&self, items: &[Item]) -> Result<()> {
        for batch in items.chunks(ITEM_BATCH_SIZE) {
            self.create_items_batch(batch).await?;
        }
        Ok(())
    }

    async fn showcase_item_ids(
        &self,
        sale_id: &str,
        limit: i64,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let first: Vec<String> = sqlx::query_scalar(
            "SELECT item_id FROM items WHERE sale_id = $1 ORDER BY item_id ASC LIMIT $2",
        )
        .bind(sale_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let last: Vec<String> = sqlx::query_scalar(
            "SELECT item_id FROM items WHERE sale_id = $1 ORDER BY item_id DESC LIMIT $2",
        )
        .bind(sale_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok((first, last))
    }

    async fn log_checkout_attempt(&self, attempt: &CheckoutAttempt) -> Result<()> {
        sqlx::query(
            "INSERT INTO checkout_attempts (sale_id, user_id, item_id, code, status)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&attempt.sale_id)
        .bind(&attempt.user_id)
        .bind(&attempt.item_id)
        .bind(&attempt.code)
        .bind(attempt.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_purchase(&self, purchase: &Purchase) -> Result<()> {
        sqlx::query("INSERT INTO purchases (sale_id, user_id, item_id) VALUES ($1, $2, $3)")
            .bind(&purchase.sale_id)
            .bind(&purchase.user_id)
            .bind(&purchase.item_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_checkout_status(&self, code: &str, status: bool) -> Result<()> {
        sqlx::query("UPDATE checkout_attempts SET status = $1 WHERE code = $2")
            .bind(status)
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_purchases(&self, sale_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE sale_id = $1")
            .bind(sale_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
