//! Embedded schema migrations.
//!
//! Migration files are compiled into the binary and applied in
//! lexicographic order, one transaction per file. Applied versions
//! are recorded in `schema_migrations(version, applied_at)`, so
//! re-running the set is idempotent.

use sqlx::PgPool;

use crate::error::Result;

/// Migration sources, ordered lexicographically by version.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_create_sales",
        include_str!("../../migrations/0001_create_sales.sql"),
    ),
    (
        "0002_create_items",
        include_str!("../../migrations/0002_create_items.sql"),
    ),
    (
        "0003_create_checkout_attempts",
        include_str!("../../migrations/0003_create_checkout_attempts.sql"),
    ),
    (
        "0004_create_purchases",
        include_str!("../../migrations/0004_create_purchases.sql"),
    ),
];

/// Apply all pending migrations.
pub(super) async fn run(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version VARCHAR(255) PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    for i in 0..MIGRATIONS.len() {
        let (version, sql) = MIGRATIONS[i];
        if !is_applied(pool, version).await? {
            apply(pool, version, sql).await?;
        }
    }

    Ok(())
}

async fn is_applied(pool: &PgPool, version: &str) -> Result<bool> {
    let applied: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(pool)
            .await?;
    Ok(applied)
}

async fn apply(pool: &PgPool, version: &str, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::raw_sql(sql).execute(&mut *tx).await?;
    sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
        .bind(version)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(version, "applied migration");
    Ok(())
}
