//! Process-wide request metrics with a JSON snapshot surface.
//!
//! Counters are plain atomics; the two latency rings keep the most
//! recent 1000 samples and report an arithmetic mean in milliseconds.
//! Active users are tracked by last-seen time and counted over a
//! five-minute window. `reset` clears counters and rings; a reader
//! racing a reset may observe a brief mix of old and new counters,
//! which is acceptable for this surface.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

/// Capacity of each latency ring.
const LATENCY_RING_CAPACITY: usize = 1000;

/// Window for counting a user as active.
const ACTIVE_USER_WINDOW: Duration = Duration::from_secs(300);

/// Request and outcome counters for the checkout/purchase surface.
#[derive(Default)]
pub struct Metrics {
    checkout_requests: AtomicU64,
    checkout_success: AtomicU64,
    checkout_failed: AtomicU64,
    purchase_requests: AtomicU64,
    purchase_success: AtomicU64,
    purchase_failed: AtomicU64,
    sold_out_errors: AtomicU64,
    user_limit_errors: AtomicU64,
    code_invalid_errors: AtomicU64,
    total_items_sold: AtomicU64,
    panic_count: AtomicU64,

    checkout_latencies: Mutex<VecDeque<Duration>>,
    purchase_latencies: Mutex<VecDeque<Duration>>,

    active_users: RwLock<HashMap<String, Instant>>,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_checkout_requests(&self) {
        self.checkout_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_checkout_success(&self) {
        self.checkout_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_checkout_failed(&self) {
        self.checkout_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_purchase_requests(&self) {
        self.purchase_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_purchase_success(&self) {
        self.purchase_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_purchase_failed(&self) {
        self.purchase_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_sold_out_errors(&self) {
        self.sold_out_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_user_limit_errors(&self) {
        self.user_limit_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_code_invalid_errors(&self) {
        self.code_invalid_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_items_sold(&self) {
        self.total_items_sold.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_panics(&self) {
        self.panic_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Push a checkout latency sample, evicting the oldest at capacity.
    pub fn record_checkout_latency(&self, latency: Duration) {
        Self::push_latency(&self.checkout_latencies, latency);
    }

    /// Push a purchase latency sample, evicting the oldest at capacity.
    pub fn record_purchase_latency(&self, latency: Duration) {
        Self::push_latency(&self.purchase_latencies, latency);
    }

    fn push_latency(ring: &Mutex<VecDeque<Duration>>, latency: Duration) {
        let mut ring = ring.lock().expect("latency ring lock poisoned");
        if ring.len() >= LATENCY_RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(latency);
    }

    /// Record activity for a user.
    pub fn touch_user(&self, user_id: &str) {
        let mut users = self.active_users.write().expect("active user lock poisoned");
        users.insert(user_id.to_string(), Instant::now());
    }

    fn mean_latency_ms(ring: &Mutex<VecDeque<Duration>>) -> f64 {
        let ring = ring.lock().expect("latency ring lock poisoned");
        if ring.is_empty() {
            return 0.0;
        }
        let total: Duration = ring.iter().sum();
        total.as_secs_f64() * 1000.0 / ring.len() as f64
    }

    fn active_user_count(&self) -> usize {
        let users = self.active_users.read().expect("active user lock poisoned");
        let now = Instant::now();
        users
            .values()
            .filter(|seen| now.duration_since(**seen) < ACTIVE_USER_WINDOW)
            .count()
    }

    /// Current snapshot as a JSON object.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let checkout_requests = self.checkout_requests.load(Ordering::Relaxed);
        let checkout_success = self.checkout_success.load(Ordering::Relaxed);
        let purchase_requests = self.purchase_requests.load(Ordering::Relaxed);
        let purchase_success = self.purchase_success.load(Ordering::Relaxed);

        let checkout_success_rate = if checkout_requests > 0 {
            checkout_success as f64 / checkout_requests as f64 * 100.0
        } else {
            0.0
        };
        let purchase_success_rate = if purchase_requests > 0 {
            purchase_success as f64 / purchase_requests as f64 * 100.0
        } else {
            0.0
        };

        json!({
            "checkout_requests": checkout_requests,
            "checkout_success": checkout_success,
            "checkout_failed": self.checkout_failed.load(Ordering::Relaxed),
            "checkout_success_rate": checkout_success_rate,
            "purchase_requests": purchase_requests,
            "purchase_success": purchase_success,
            "purchase_failed": self.purchase_failed.load(Ordering::Relaxed),
            "purchase_success_rate": purchase_success_rate,
            "sold_out_errors": self.sold_out_errors.load(Ordering::Relaxed),
            "user_limit_errors": self.user_limit_errors.load(Ordering::Relaxed),
            "code_invalid_errors": self.code_invalid_errors.load(Ordering::Relaxed),
            "total_items_sold": self.total_items_sold.load(Ordering::Relaxed),
            "panic_count": self.panic_count.load(Ordering::Relaxed),
            "active_users_5min": self.active_user_count(),
            "avg_checkout_latency_ms": Self::mean_latency_ms(&self.checkout_latencies),
            "avg_purchase_latency_ms": Self::mean_latency_ms(&self.purchase_latencies),
        })
    }

    /// Clear all counters, rings, and the active-user map.
    pub fn reset(&self) {
        self.checkout_requests.store(0, Ordering::Relaxed);
        self.checkout_success.store(0, Ordering::Relaxed);
        self.checkout_failed.store(0, Ordering::Relaxed);
        self.purchase_requests.store(0, Ordering::Relaxed);
        self.purchase_success.store(0, Ordering::Relaxed);
        self.purchase_failed.store(0, Ordering::Relaxed);
        self.sold_out_errors.store(0, Ordering::Relaxed);
        self.user_limit_errors.store(0, Ordering::Relaxed);
        self.code_invalid_errors.store(0, Ordering::Relaxed);
        self.total_items_sold.store(0, Ordering::Relaxed);
        self.panic_count.store(0, Ordering::Relaxed);

        self.checkout_latencies
            .lock()
            .expect("latency ring lock poisoned")
            .clear();
        self.purchase_latencies
            .lock()
            .expect("latency ring lock poisoned")
            .clear();
        self.active_users
            .write()
            .expect("active user lock poisoned")
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_snapshot() {
        let metrics = Metrics::new();
        metrics.incr_checkout_requests();
        metrics.incr_checkout_requests();
        metrics.incr_checkout_success();
        metrics.incr_sold_out_errors();
        metrics.incr_items_sold();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot["checkout_requests"], 2);
        assert_eq!(snapshot["checkout_success"], 1);
        assert_eq!(snapshot["sold_out_errors"], 1);
        assert_eq!(snapshot["total_items_sold"], 1);
        assert_eq!(snapshot["checkout_success_rate"], 50.0);
    }

    #[test]
    fn latency_ring_reports_mean_and_caps_size() {
        let metrics = Metrics::new();
        metrics.record_checkout_latency(Duration::from_millis(10));
        metrics.record_checkout_latency(Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        let mean = snapshot["avg_checkout_latency_ms"].as_f64().unwrap();
        assert!((mean - 20.0).abs() < 1e-6);

        for _ in 0..(LATENCY_RING_CAPACITY + 50) {
            metrics.record_checkout_latency(Duration::from_millis(5));
        }
        let ring = metrics.checkout_latencies.lock().unwrap();
        assert_eq!(ring.len(), LATENCY_RING_CAPACITY);
    }

    #[test]
    fn active_users_counted_within_window() {
        let metrics = Metrics::new();
        metrics.touch_user("alice");
        metrics.touch_user("bob");
        metrics.touch_user("alice");

        assert_eq!(metrics.snapshot()["active_users_5min"], 2);
    }

    #[test]
    fn reset_clears_everything() {
        let metrics = Metrics::new();
        metrics.incr_checkout_requests();
        metrics.incr_purchase_success();
        metrics.record_purchase_latency(Duration::from_millis(7));
        metrics.touch_user("alice");

        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot["checkout_requests"], 0);
        assert_eq!(snapshot["purchase_success"], 0);
        assert_eq!(snapshot["active_users_5min"], 0);
        assert_eq!(snapshot["avg_purchase_latency_ms"], 0.0);
    }
}
