//! Configuration management for the flash-sale service.
//!
//! Loads configuration from environment variables with sensible
//! defaults. Every knob that tests or load rigs need to shrink (item
//! counts, code TTL) is overridable, but the defaults match the
//! production sale shape.

use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Redis hot-tier configuration
    pub redis: RedisConfig,
    /// `PostgreSQL` audit-tier configuration
    pub database: DatabaseConfig,
    /// Sale shape and protocol limits
    pub sale: SaleConfig,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Deployment environment label (`APP_ENV`)
    pub environment: String,
    /// Per-request deadline, propagated to all downstream calls
    pub request_timeout: Duration,
}

/// Redis configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis address as `host:port` (`REDIS_ADDR`)
    pub addr: String,
    /// Optional password (`REDIS_PASSWORD`)
    pub password: Option<String>,
}

impl RedisConfig {
    /// Connection URL for the redis client.
    #[must_use]
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => {
                format!("redis://:{}@{}", password, self.addr)
            }
            _ => format!("redis://{}", self.addr),
        }
    }
}

/// `PostgreSQL` configuration, assembled from the `BLUEPRINT_DB_*`
/// variable family.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Schema applied as `search_path` on every pooled connection
    pub schema: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
}

impl DatabaseConfig {
    /// Connection URL for sqlx.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// Sale shape and protocol limits.
#[derive(Debug, Clone)]
pub struct SaleConfig {
    /// Items per sale
    pub total_items: i64,
    /// Per-user committed-purchase cap per sale
    pub max_per_user: u32,
    /// Sale window length; also the rotation period
    pub duration: Duration,
    /// Reservation code lifetime
    pub code_ttl: Duration,
    /// Per-user request budget per minute on checkout/purchase
    pub rate_limit_per_minute: i64,
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self {
            total_items: 10_000,
            max_per_user: 10,
            duration: Duration::from_secs(3600),
            code_ttl: Duration::from_secs(300),
            rate_limit_per_minute: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
                environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                request_timeout: Duration::from_secs(
                    env::var("REQUEST_TIMEOUT_SECONDS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(30),
                ),
            },
            redis: RedisConfig {
                addr: env::var("REDIS_ADDR").unwrap_or_else(|_| "localhost:6379".to_string()),
                password: env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
            },
            database: DatabaseConfig {
                host: env::var("BLUEPRINT_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: env::var("BLUEPRINT_DB_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5432),
                database: env::var("BLUEPRINT_DB_DATABASE")
                    .unwrap_or_else(|_| "flash_sale".to_string()),
                username: env::var("BLUEPRINT_DB_USERNAME")
                    .unwrap_or_else(|_| "postgres".to_string()),
                password: env::var("BLUEPRINT_DB_PASSWORD")
                    .unwrap_or_else(|_| "postgres".to_string()),
                schema: env::var("BLUEPRINT_DB_SCHEMA").unwrap_or_else(|_| "public".to_string()),
                max_connections: env::var("BLUEPRINT_DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
                min_connections: env::var("BLUEPRINT_DB_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20),
            },
            sale: SaleConfig {
                total_items: env::var("SALE_TOTAL_ITEMS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10_000),
                max_per_user: env::var("SALE_MAX_PER_USER")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                duration: Duration::from_secs(
                    env::var("SALE_DURATION_SECONDS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(3600),
                ),
                code_ttl: Duration::from_secs(
                    env::var("CHECKOUT_CODE_TTL_SECONDS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(300),
                ),
                rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_url_with_and_without_password() {
        let mut redis = RedisConfig {
            addr: "cache:6379".into(),
            password: None,
        };
        assert_eq!(redis.url(), "redis://cache:6379");

        redis.password = Some("hunter2".into());
        assert_eq!(redis.url(), "redis://:hunter2@cache:6379");
    }

    #[test]
    fn database_url_assembles_parts() {
        let db = DatabaseConfig {
            host: "db".into(),
            port: 5433,
            database: "sales".into(),
            username: "svc".into(),
            password: "secret".into(),
            schema: "public".into(),
            max_connections: 100,
            min_connections: 20,
        };
        assert_eq!(
            db.url(),
            "postgres://svc:secret@db:5433/sales?sslmode=disable"
        );
    }

    #[test]
    fn sale_defaults_match_production_shape() {
        let sale = SaleConfig::default();
        assert_eq!(sale.total_items, 10_000);
        assert_eq!(sale.max_per_user, 10);
        assert_eq!(sale.duration, Duration::from_secs(3600));
        assert_eq!(sale.code_ttl, Duration::from_secs(300));
        assert_eq!(sale.rate_limit_per_minute, 100);
    }
}
