//! Cache invalidation consumer.

use std::sync::Arc;

use async_trait::async_trait;
use cache::Cache;
use domain::{DomainEvent, ShopEvent};

use crate::Result;
use crate::dispatcher::EventConsumer;

/// Exact cache key for one product record.
pub fn product_key(product_id: u64) -> String {
    format!("product:{product_id}")
}

/// Exact cache key for one user's cart.
pub fn cart_key(user_id: &str) -> String {
    format!("cart:{user_id}")
}

/// Pattern matching every cached product listing.
pub const PRODUCT_LISTINGS_PATTERN: &str = "products:*";

/// Pattern matching every cached cart listing.
pub const CART_LISTINGS_PATTERN: &str = "carts:*";

/// The keys affected by one event: an exact per-entity key plus listing
/// patterns whose membership cannot be determined without re-querying.
fn eviction_targets(event: &ShopEvent) -> (String, &'static [&'static str]) {
    match event {
        ShopEvent::ProductCreated(d) => (product_key(d.product_id.value()), &[PRODUCT_LISTINGS_PATTERN]),
        ShopEvent::ProductUpdated(d) => (product_key(d.product_id.value()), &[PRODUCT_LISTINGS_PATTERN]),
        ShopEvent::ProductPriceChanged(d) => (product_key(d.product_id.value()), &[PRODUCT_LISTINGS_PATTERN]),
        ShopEvent::ProductDeleted(d) => (product_key(d.product_id.value()), &[PRODUCT_LISTINGS_PATTERN]),
        ShopEvent::CartCreated(d) => (cart_key(d.user_id.as_str()), &[CART_LISTINGS_PATTERN]),
        ShopEvent::ItemAdded(d) => (cart_key(d.user_id.as_str()), &[CART_LISTINGS_PATTERN]),
        ShopEvent::ItemRemoved(d) => (cart_key(d.user_id.as_str()), &[CART_LISTINGS_PATTERN]),
        ShopEvent::ItemQuantityChanged(d) => (cart_key(d.user_id.as_str()), &[CART_LISTINGS_PATTERN]),
        ShopEvent::CartCheckedOut(d) => (cart_key(d.user_id.as_str()), &[CART_LISTINGS_PATTERN]),
        ShopEvent::CartCleared(d) => (cart_key(d.user_id.as_str()), &[CART_LISTINGS_PATTERN]),
    }
}

/// Dispatcher consumer evicting cache entries made stale by an event.
///
/// Evicts the exact per-entity key and, unconditionally, the listing
/// patterns for that entity kind: listing membership cannot be known
/// without re-querying, so correctness is favored over hit rate. A
/// backend failure is logged and swallowed; a stale entry is tolerated
/// as degraded rather than failing the pipeline.
pub struct CacheInvalidator {
    cache: Arc<dyn Cache>,
}

impl CacheInvalidator {
    /// Creates an invalidator evicting from the given cache.
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventConsumer for CacheInvalidator {
    fn name(&self) -> &'static str {
        "cache-invalidator"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        let (exact_key, patterns) = eviction_targets(&event.event);

        if let Err(err) = self.cache.remove(&exact_key).await {
            tracing::warn!(key = %exact_key, error = %err, "cache eviction failed");
        } else {
            metrics::counter!("cache_evictions").increment(1);
        }

        for pattern in patterns {
            match self.cache.remove_by_pattern(pattern).await {
                Ok(removed) => {
                    metrics::counter!("cache_evictions").increment(removed as u64);
                }
                Err(err) => {
                    tracing::warn!(pattern = %pattern, error = %err, "cache pattern eviction failed");
                }
            }
        }

        Ok(())
    }
}
