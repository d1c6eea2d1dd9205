//! Flash-sale coordination service.
//!
//! Every hour a fresh sale opens with a fixed inventory; clients race
//! through a two-step protocol where checkout issues a short-lived
//! reservation code and purchase redeems it. The hot path lives in a
//! scriptable in-memory store whose atomic operations enforce the
//! numeric invariants (no oversell, per-user cap, single-use codes);
//! a relational store keeps the durable audit trail.
//!
//! Layering, leaves first: [`cache`] and [`db`] are the store tiers
//! behind trait seams, [`engine`] implements the reservation/commit
//! protocol over them, [`sale`] rotates the hourly window, and
//! [`server`]/[`api`] adapt HTTP requests onto the engine.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod sale;
pub mod server;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
