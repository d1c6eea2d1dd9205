//! Sale lifecycle management.
//!
//! One sale is live at a time. [`SaleManager::start`] opens the first
//! sale immediately and then rotates on a fixed period; each rotation
//! persists the sale and its catalogue, warms the showcase cache,
//! seeds the fast tier atomically, and finally swaps the shared
//! current-sale pointer. Any failure before the swap aborts the
//! rotation and leaves the previous sale current until the next tick.

use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use rand::Rng;
use tokio::time::MissedTickBehavior;

use crate::cache::FastStore;
use crate::config::SaleConfig;
use crate::db::DurableStore;
use crate::error::Result;
use crate::types::{ActiveSale, Item, Sale};

/// Item ids exposed on each end of the showcase.
pub(crate) const SHOWCASE_LIMIT: i64 = 10;

const ADJECTIVES: &[&str] = &[
    "Amber", "Blazing", "Cobalt", "Dusk", "Ember", "Frosted", "Gilded", "Hollow", "Ivory",
    "Jade", "Kinetic", "Lunar", "Midnight", "Nimble", "Obsidian", "Polished", "Quiet", "Rustic",
    "Silent", "Tidal", "Umbral", "Vivid", "Woven", "Zephyr",
];

const NOUNS: &[&str] = &[
    "Anchor", "Beacon", "Compass", "Drum", "Ember", "Flask", "Gauntlet", "Horn", "Idol",
    "Jar", "Kite", "Lantern", "Mantle", "Needle", "Oar", "Prism", "Quill", "Relic",
    "Sigil", "Talisman", "Urn", "Vessel", "Wreath", "Zither",
];

/// Owns the current-sale pointer and the hourly rotation.
pub struct SaleManager {
    db: Arc<dyn DurableStore>,
    cache: Arc<dyn FastStore>,
    config: SaleConfig,
    current: RwLock<Option<ActiveSale>>,
    // (unix second, suffix) of the last generated id, to keep ids
    // unique when two rotations land in the same second.
    last_id: Mutex<(i64, u32)>,
}

impl SaleManager {
    #[must_use]
    pub fn new(db: Arc<dyn DurableStore>, cache: Arc<dyn FastStore>, config: SaleConfig) -> Self {
        Self {
            db,
            cache,
            config,
            current: RwLock::new(None),
            last_id: Mutex::new((0, 0)),
        }
    }

    /// Run migrations, open the first sale, and arm the rotation timer.
    ///
    /// # Errors
    ///
    /// Fails if migrations or the initial sale cannot complete; later
    /// rotation failures are logged and retried at the next tick.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.db.run_migrations().await?;
        self.open_new_sale().await?;

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.config.duration);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial sale
            // is already open.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = manager.open_new_sale().await {
                    tracing::error!(
                        ?error,
                        "sale rotation failed; previous sale remains current"
                    );
                }
            }
        });

        tracing::info!("sale manager started");
        Ok(())
    }

    /// Snapshot of the sale currently accepting checkouts.
    #[must_use]
    pub fn current_sale(&self) -> Option<ActiveSale> {
        self.current
            .read()
            .expect("current sale lock poisoned")
            .clone()
    }

    /// Open a new sale and make it current.
    ///
    /// Ordering matters: everything durable and cache-side is in
    /// place before the pointer swap, so a request that sees the new
    /// sale also sees its inventory. The outgoing sale's row is
    /// flipped to `ended` after the swap; that flip is display-only
    /// and non-fatal on failure.
    pub async fn open_new_sale(&self) -> Result<()> {
        let now = Utc::now();
        let sale_id = self.next_sale_id(now.timestamp());
        let end_time = now + chrono::Duration::seconds(self.config.duration.as_secs() as i64);
        tracing::info!(%sale_id, "opening new sale");

        self.db
            .create_sale(&Sale {
                sale_id: sale_id.clone(),
                start_time: now,
                end_time,
                total_items: self.config.total_items,
                status: "active".to_string(),
            })
            .await?;

        let items = self.generate_items(&sale_id);
        self.db.create_items(&items).await?;

        match self.db.showcase_item_ids(&sale_id, SHOWCASE_LIMIT).await {
            Ok((first_item_ids, last_item_ids)) => {
                let info = crate::types::ShowcaseInfo {
                    first_item_ids,
                    last_item_ids,
                };
                if let Err(error) = self.cache.set_showcase(&sale_id, &info).await {
                    tracing::warn!(?error, %sale_id, "failed to warm showcase cache");
                }
            }
            Err(error) => {
                tracing::warn!(?error, %sale_id, "could not load showcase ids");
            }
        }

        self.cache
            .init_sale(&sale_id, self.config.total_items)
            .await?;

        let previous = {
            let mut current = self.current.write().expect("current sale lock poisoned");
            current.replace(ActiveSale {
                sale_id: sale_id.clone(),
                start_time: now,
                end_time,
            })
        };

        if let Some(previous) = previous {
            if let Err(error) = self.db.end_sale(&previous.sale_id).await {
                tracing::warn!(?error, sale_id = %previous.sale_id, "failed to end previous sale");
            }
        }

        tracing::info!(%sale_id, total_items = self.config.total_items, "sale is active");
        Ok(())
    }

    /// `sale_<unix>` with a monotonic suffix when the second repeats.
    fn next_sale_id(&self, unix: i64) -> String {
        let mut last = self.last_id.lock().expect("sale id lock poisoned");
        if last.0 == unix {
            last.1 += 1;
            format!("sale_{unix}_{}", last.1)
        } else {
            *last = (unix, 0);
            format!("sale_{unix}")
        }
    }

    /// Generate the cosmetic catalogue for a sale. Sequence numbers
    /// are one-based and zero-padded to six digits.
    fn generate_items(&self, sale_id: &str) -> Vec<Item> {
        let mut rng = rand::thread_rng();
        (1..=self.config.total_items)
            .map(|sequence| {
                let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
                let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
                Item {
                    item_id: format!("{sale_id}_item_{sequence:06}"),
                    sale_id: sale_id.to_string(),
                    name: format!("{adjective} {noun}"),
                    image_url: format!(
                        "https://placehold.co/400x400/{:06x}/FFFFFF?text={adjective}+{noun}",
                        rng.gen_range(0..0xFF_FFFFu32)
                    ),
                }
            })
            .collect()
    }
}
