//! Tests for the Redis-backed fast store.
//!
//! These require a running Redis instance:
//! `docker run -d -p 6379:6379 redis:7-alpine`
//!
//! Run with: `cargo test --test redis_store_test -- --ignored`

use std::time::Duration;

use chrono::Utc;
use flash_sale::cache::{FastStore, RedisStore, ReserveOutcome};
use flash_sale::types::{CheckoutRecord, ShowcaseInfo};

const REDIS_URL: &str = "redis://127.0.0.1:6379";

async fn store() -> RedisStore {
    RedisStore::connect(REDIS_URL)
        .await
        .expect("redis reachable")
}

fn unique_sale_id(tag: &str) -> String {
    format!("test_{tag}_{}", Utc::now().timestamp_nanos_opt().unwrap_or(0))
}

fn record(sale_id: &str, user_id: &str) -> CheckoutRecord {
    CheckoutRecord {
        user_id: user_id.to_string(),
        item_id: format!("{sale_id}_item_000001"),
        sale_id: sale_id.to_string(),
        expires_at: Utc::now() + chrono::Duration::minutes(5),
    }
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn init_sale_seeds_inventory() {
    let store = store().await;
    let sale_id = unique_sale_id("init");

    store.init_sale(&sale_id, 100).await.unwrap();
    assert_eq!(store.inventory(&sale_id).await.unwrap(), 100);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reserve_counts_down_to_sold_out() {
    let store = store().await;
    let sale_id = unique_sale_id("soldout");
    store.init_sale(&sale_id, 2).await.unwrap();

    assert_eq!(
        store.reserve(&sale_id, "a", 10).await.unwrap(),
        ReserveOutcome::Reserved
    );
    assert_eq!(
        store.reserve(&sale_id, "b", 10).await.unwrap(),
        ReserveOutcome::Reserved
    );
    assert_eq!(
        store.reserve(&sale_id, "c", 10).await.unwrap(),
        ReserveOutcome::SoldOut
    );

    // The failed attempt compensated its decrement.
    assert_eq!(store.inventory(&sale_id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn reserve_enforces_user_cap_without_touching_inventory() {
    let store = store().await;
    let sale_id = unique_sale_id("cap");
    store.init_sale(&sale_id, 50).await.unwrap();

    store.inc_user(&sale_id, "alice").await.unwrap();
    store.inc_user(&sale_id, "alice").await.unwrap();

    assert_eq!(
        store.reserve(&sale_id, "alice", 2).await.unwrap(),
        ReserveOutcome::UserLimitExceeded
    );
    assert_eq!(store.inventory(&sale_id).await.unwrap(), 50);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn concurrent_consumes_hand_the_code_to_exactly_one_caller() {
    let store = store().await;
    let sale_id = unique_sale_id("race");
    let code = format!("code_{sale_id}");
    store
        .store_code(&code, &record(&sale_id, "alice"), Duration::from_secs(60))
        .await
        .unwrap();

    let store_a = store.clone();
    let store_b = store.clone();
    let code_a = code.clone();
    let code_b = code.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { store_a.consume_code(&code_a).await.unwrap() }),
        tokio::spawn(async move { store_b.consume_code(&code_b).await.unwrap() }),
    );

    let a = a.unwrap().is_some();
    let b = b.unwrap().is_some();
    assert!(a ^ b, "exactly one consumer must win, got {a}/{b}");
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn code_expires_with_its_ttl() {
    let store = store().await;
    let sale_id = unique_sale_id("ttl");
    let code = format!("code_{sale_id}");
    store
        .store_code(&code, &record(&sale_id, "alice"), Duration::from_secs(1))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(store.consume_code(&code).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn refund_returns_a_unit() {
    let store = store().await;
    let sale_id = unique_sale_id("refund");
    store.init_sale(&sale_id, 5).await.unwrap();

    store.reserve(&sale_id, "alice", 10).await.unwrap();
    assert_eq!(store.inventory(&sale_id).await.unwrap(), 4);

    store.refund(&sale_id).await.unwrap();
    assert_eq!(store.inventory(&sale_id).await.unwrap(), 5);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn showcase_round_trips() {
    let store = store().await;
    let sale_id = unique_sale_id("showcase");

    assert!(store.get_showcase(&sale_id).await.unwrap().is_none());

    let info = ShowcaseInfo {
        first_item_ids: vec![format!("{sale_id}_item_000001")],
        last_item_ids: vec![format!("{sale_id}_item_000100")],
    };
    store.set_showcase(&sale_id, &info).await.unwrap();
    assert_eq!(store.get_showcase(&sale_id).await.unwrap(), Some(info));
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn rate_limit_counts_per_user() {
    let store = store().await;
    let user = unique_sale_id("limiter");

    assert_eq!(store.rate_limit_hit(&user).await.unwrap(), 1);
    assert_eq!(store.rate_limit_hit(&user).await.unwrap(), 2);
    assert_eq!(store.rate_limit_hit(&user).await.unwrap(), 3);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn init_sale_clears_stale_per_sale_state() {
    let store = store().await;
    let sale_id = unique_sale_id("reinit");

    store.init_sale(&sale_id, 10).await.unwrap();
    store.inc_user(&sale_id, "alice").await.unwrap();
    store.mark_sold(&sale_id, 1).await.unwrap();

    store.init_sale(&sale_id, 10).await.unwrap();
    assert_eq!(
        store.reserve(&sale_id, "alice", 1).await.unwrap(),
        ReserveOutcome::Reserved
    );
}
