//! Shared harness for integration tests.
//!
//! Builds the full application (router, engine, rotator) over the
//! in-memory store implementations, so tests exercise the real HTTP
//! surface deterministically and without external services.

// Each test binary uses its own subset of this harness.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use flash_sale::cache::{FastStore, MemoryStore as MemoryCache};
use flash_sale::config::{Config, DatabaseConfig, RedisConfig, SaleConfig, ServerConfig};
use flash_sale::db::{DurableStore, MemoryStore as MemoryDb};
use flash_sale::engine::ReservationEngine;
use flash_sale::metrics::Metrics;
use flash_sale::sale::SaleManager;
use flash_sale::server::{build_router, AppState};

/// A sale config small enough to exhaust in a test.
pub fn small_sale(total_items: i64, max_per_user: u32) -> SaleConfig {
    SaleConfig {
        total_items,
        max_per_user,
        duration: Duration::from_secs(3600),
        code_ttl: Duration::from_secs(300),
        rate_limit_per_minute: 10_000,
    }
}

fn test_config(sale: SaleConfig) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            request_timeout: Duration::from_secs(30),
        },
        redis: RedisConfig {
            addr: "localhost:6379".to_string(),
            password: None,
        },
        database: DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "flash_sale_test".to_string(),
            username: "postgres".to_string(),
            password: "postgres".to_string(),
            schema: "public".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        sale,
    }
}

pub struct TestApp {
    pub state: AppState,
    pub cache: Arc<MemoryCache>,
    pub db: Arc<MemoryDb>,
    pub sales: Arc<SaleManager>,
}

impl TestApp {
    /// Build the application and open an initial sale.
    pub async fn start(sale_config: SaleConfig) -> Self {
        let app = Self::build(sale_config).await;
        app.sales.open_new_sale().await.expect("open initial sale");
        app
    }

    /// Build the application without opening a sale.
    pub async fn build(sale_config: SaleConfig) -> Self {
        let cache = Arc::new(MemoryCache::new());
        let db = Arc::new(MemoryDb::new());
        let cache_dyn: Arc<dyn FastStore> = cache.clone();
        let db_dyn: Arc<dyn DurableStore> = db.clone();

        let sales = Arc::new(SaleManager::new(
            db_dyn.clone(),
            cache_dyn.clone(),
            sale_config.clone(),
        ));
        let engine = Arc::new(ReservationEngine::new(
            cache_dyn.clone(),
            db_dyn.clone(),
            sales.clone(),
            sale_config.clone(),
        ));
        let state = AppState::new(
            Arc::new(test_config(sale_config)),
            cache_dyn,
            db_dyn,
            sales.clone(),
            engine,
            Arc::new(Metrics::new()),
        );

        Self {
            state,
            cache,
            db,
            sales,
        }
    }

    pub fn sale_id(&self) -> String {
        self.sales
            .current_sale()
            .expect("a sale should be active")
            .sale_id
    }

    /// An item id belonging to the current sale.
    pub fn item(&self, sequence: u32) -> String {
        format!("{}_item_{sequence:06}", self.sale_id())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri).await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, Value) {
        self.request("POST", uri).await
    }

    async fn request(&self, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = build_router(self.state.clone())
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("infallible router call");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// Checkout for `user`, returning the issued code on 200.
    pub async fn checkout(&self, user: &str, item: &str) -> (StatusCode, Option<String>) {
        let (status, body) = self
            .post(&format!("/checkout?user_id={user}&id={item}"))
            .await;
        let code = body["code"].as_str().map(str::to_string);
        (status, code)
    }

    /// Purchase with `code`.
    pub async fn purchase(&self, code: &str) -> (StatusCode, Value) {
        self.post(&format!("/purchase?code={code}")).await
    }

    /// Let fire-and-forget audit writes land.
    pub async fn quiesce(&self) {
        tokio::time::sleep(Duration::from_millis(60)).await;
    }
}
