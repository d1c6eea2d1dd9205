//! Domain types for the flash-sale system.
//!
//! Sales rotate hourly; item identifiers embed both the owning sale
//! and a six-digit sequence number (`<sale_id>_item_000042`), which is
//! what the sold-bitmap indexing recovers via [`item_sequence`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the sale currently accepting checkouts.
///
/// Produced by the rotator and handed out by value; the rotator swaps
/// the shared pointer atomically, so a snapshot never mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSale {
    pub sale_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Payload stored under `checkout_code:<hex>` while a reservation is live.
///
/// Field names are part of the wire format shared with the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRecord {
    pub user_id: String,
    pub item_id: String,
    pub sale_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Cosmetic first/last item ids cached for the sale-info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowcaseInfo {
    pub first_item_ids: Vec<String>,
    pub last_item_ids: Vec<String>,
}

/// Row written to `sales` when a sale opens.
#[derive(Debug, Clone)]
pub struct Sale {
    pub sale_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_items: i64,
    pub status: String,
}

/// Row written to `items`; one per sellable unit, generated in bulk.
#[derive(Debug, Clone)]
pub struct Item {
    pub item_id: String,
    pub sale_id: String,
    pub name: String,
    pub image_url: String,
}

/// Row appended to `checkout_attempts` when a code is issued.
///
/// `status` starts false and flips to true when the code is redeemed.
#[derive(Debug, Clone)]
pub struct CheckoutAttempt {
    pub sale_id: String,
    pub user_id: String,
    pub item_id: String,
    pub code: String,
    pub status: bool,
}

/// Row appended to `purchases` on a successful commit.
#[derive(Debug, Clone)]
pub struct Purchase {
    pub sale_id: String,
    pub user_id: String,
    pub item_id: String,
}

/// Extract the sequence number from an item id.
///
/// The sequence is the integer after the last `_item_` delimiter.
/// Returns `None` for ids that do not follow the generated format;
/// callers skip the bitmap write in that case.
#[must_use]
pub fn item_sequence(item_id: &str) -> Option<u32> {
    let (_, seq) = item_id.rsplit_once("_item_")?;
    seq.parse().ok()
}

/// Extract the sale id prefix from an item id, if it has one.
#[must_use]
pub fn item_sale_id(item_id: &str) -> Option<&str> {
    item_id.rsplit_once("_item_").map(|(sale, _)| sale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_parses_generated_ids() {
        assert_eq!(item_sequence("sale_1700000000_item_000001"), Some(1));
        assert_eq!(item_sequence("sale_1700000000_item_010000"), Some(10_000));
    }

    #[test]
    fn sequence_rejects_malformed_ids() {
        assert_eq!(item_sequence("sale_1700000000"), None);
        assert_eq!(item_sequence("sale_1700000000_item_"), None);
        assert_eq!(item_sequence("sale_1700000000_item_abc"), None);
    }

    #[test]
    fn sequence_uses_last_delimiter() {
        // A sale id could itself contain the delimiter; the suffix wins.
        assert_eq!(item_sequence("odd_item_1_item_000007"), Some(7));
        assert_eq!(item_sale_id("odd_item_1_item_000007"), Some("odd_item_1"));
    }

    #[test]
    fn sale_prefix_recovers_owner() {
        assert_eq!(
            item_sale_id("sale_1700000000_item_000001"),
            Some("sale_1700000000")
        );
        assert_eq!(item_sale_id("not-an-item"), None);
    }

    #[test]
    fn checkout_record_round_trips_as_json() {
        let record = CheckoutRecord {
            user_id: "alice".into(),
            item_id: "sale_1_item_000001".into(),
            sale_id: "sale_1".into(),
            expires_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"user_id\""));
        assert!(json.contains("\"expires_at\""));
        let back: CheckoutRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
