//! Domain events for products and carts.

use chrono::{DateTime, Utc};
use common::Actor;
use event_store::EventId;
use serde::{Deserialize, Serialize};

/// Monetary amount in cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Zero amount.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns true if the amount is below zero.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies the amount by a quantity.
    pub fn times(&self, quantity: u32) -> Money {
        Money(self.0 * i64::from(quantity))
    }

    /// Adds two amounts.
    pub fn plus(&self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

/// Identifier of a product.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Creates a product id from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user owning a cart. One user owns at most one cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of domain facts raised by product and cart operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShopEvent {
    /// A product was added to the catalog.
    ProductCreated(ProductCreatedData),

    /// A product's name or category changed.
    ProductUpdated(ProductUpdatedData),

    /// A product's unit price changed.
    ProductPriceChanged(ProductPriceChangedData),

    /// A product was retired from the catalog.
    ProductDeleted(ProductDeletedData),

    /// A cart was created for a user.
    CartCreated(CartCreatedData),

    /// An item was added to a cart.
    ItemAdded(ItemAddedData),

    /// An item was removed from a cart.
    ItemRemoved(ItemRemovedData),

    /// An item's quantity in a cart changed.
    ItemQuantityChanged(ItemQuantityChangedData),

    /// A cart was checked out.
    CartCheckedOut(CartCheckedOutData),

    /// All items were removed from a cart.
    CartCleared(CartClearedData),
}

impl ShopEvent {
    /// Every event type tag, for wiring consumers that listen to all
    /// domain facts.
    pub const ALL_TYPES: [&'static str; 10] = [
        "ProductCreated",
        "ProductUpdated",
        "ProductPriceChanged",
        "ProductDeleted",
        "CartCreated",
        "ItemAdded",
        "ItemRemoved",
        "ItemQuantityChanged",
        "CartCheckedOut",
        "CartCleared",
    ];

    /// Returns the event type tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            ShopEvent::ProductCreated(_) => "ProductCreated",
            ShopEvent::ProductUpdated(_) => "ProductUpdated",
            ShopEvent::ProductPriceChanged(_) => "ProductPriceChanged",
            ShopEvent::ProductDeleted(_) => "ProductDeleted",
            ShopEvent::CartCreated(_) => "CartCreated",
            ShopEvent::ItemAdded(_) => "ItemAdded",
            ShopEvent::ItemRemoved(_) => "ItemRemoved",
            ShopEvent::ItemQuantityChanged(_) => "ItemQuantityChanged",
            ShopEvent::CartCheckedOut(_) => "CartCheckedOut",
            ShopEvent::CartCleared(_) => "CartCleared",
        }
    }
}

/// Data for ProductCreated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreatedData {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    pub unit_price: Money,
}

/// Data for ProductUpdated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdatedData {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
}

/// Data for ProductPriceChanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPriceChangedData {
    pub product_id: ProductId,
    pub old_price: Money,
    pub new_price: Money,
}

/// Data for ProductDeleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDeletedData {
    pub product_id: ProductId,
}

/// Data for CartCreated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCreatedData {
    pub user_id: UserId,
}

/// Data for ItemAdded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAddedData {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Data for ItemRemoved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRemovedData {
    pub user_id: UserId,
    pub product_id: ProductId,
}

/// Data for ItemQuantityChanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemQuantityChangedData {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

/// Data for CartCheckedOut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCheckedOutData {
    pub user_id: UserId,
    pub total: Money,
    pub item_count: usize,
}

/// Data for CartCleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartClearedData {
    pub user_id: UserId,
}

/// An immutable record of a domain fact.
///
/// Created once by the business operation that caused it, staged on the
/// entity's buffer, dispatched after the write is durable, and then
/// discarded. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique identifier of this event.
    pub event_id: EventId,

    /// When the fact occurred.
    pub occurred_on: DateTime<Utc>,

    /// Who caused the fact.
    pub actor: Actor,

    /// The fact itself.
    pub event: ShopEvent,
}

impl DomainEvent {
    /// Records a fact with a fresh id and the current time.
    pub fn record(actor: Actor, event: ShopEvent) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_on: Utc::now(),
            actor,
            event,
        }
    }

    /// Returns the event type tag.
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_tags_match_variants() {
        let event = ShopEvent::ItemAdded(ItemAddedData {
            user_id: UserId::new("u1"),
            product_id: ProductId::new(42),
            product_name: "Widget".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(1500),
        });
        assert_eq!(event.event_type(), "ItemAdded");

        let event = ShopEvent::CartCleared(CartClearedData {
            user_id: UserId::new("u1"),
        });
        assert_eq!(event.event_type(), "CartCleared");
    }

    #[test]
    fn all_types_covers_every_variant_tag() {
        // A serialized event's tag must always appear in ALL_TYPES, or a
        // consumer registered via ALL_TYPES would silently miss it.
        let event = ShopEvent::ProductDeleted(ProductDeletedData {
            product_id: ProductId::new(1),
        });
        assert!(ShopEvent::ALL_TYPES.contains(&event.event_type()));
        assert_eq!(ShopEvent::ALL_TYPES.len(), 10);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = ShopEvent::ProductPriceChanged(ProductPriceChangedData {
            product_id: ProductId::new(7),
            old_price: Money::from_cents(1000),
            new_price: Money::from_cents(1200),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ProductPriceChanged"));

        let deserialized: ShopEvent = serde_json::from_str(&json).unwrap();
        if let ShopEvent::ProductPriceChanged(data) = deserialized {
            assert_eq!(data.product_id, ProductId::new(7));
            assert_eq!(data.new_price.cents(), 1200);
        } else {
            panic!("Expected ProductPriceChanged event");
        }
    }

    #[test]
    fn record_captures_identity_and_actor() {
        let record = DomainEvent::record(
            Actor::user("u1", "Alice"),
            ShopEvent::CartCreated(CartCreatedData {
                user_id: UserId::new("u1"),
            }),
        );

        assert_eq!(record.event_type(), "CartCreated");
        assert_eq!(record.actor.user_id.as_deref(), Some("u1"));

        let other = DomainEvent::record(
            Actor::system(),
            ShopEvent::CartCreated(CartCreatedData {
                user_id: UserId::new("u1"),
            }),
        );
        assert_ne!(record.event_id, other.event_id);
    }

    #[test]
    fn money_arithmetic() {
        let price = Money::from_cents(1500);
        assert_eq!(price.times(2).cents(), 3000);
        assert_eq!(price.plus(Money::from_cents(500)).cents(), 2000);
        assert!(Money::from_cents(-1).is_negative());
        assert_eq!(Money::zero().cents(), 0);
    }
}
