//! Shopping cart entity.

use common::Actor;
use thiserror::Error;

use crate::buffer::{EventBuffer, EventSource};
use crate::event::{
    CartCheckedOutData, CartClearedData, CartCreatedData, DomainEvent, ItemAddedData,
    ItemQuantityChangedData, ItemRemovedData, Money, ProductId, ShopEvent, UserId,
};

/// Errors from cart business rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Quantities must be at least one.
    #[error("Quantity must be greater than zero")]
    ZeroQuantity,

    /// The product is not in the cart.
    #[error("Product {0} is not in the cart")]
    ItemNotFound(ProductId),

    /// An empty cart cannot be checked out.
    #[error("Cannot check out an empty cart")]
    EmptyCart,

    /// The cart has already been checked out.
    #[error("Cart for user {0} is already checked out")]
    CheckedOut(UserId),
}

/// A line item in a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// A user's shopping cart.
///
/// One cart per user; the audit stream key is derived from the user id.
#[derive(Debug)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
    checked_out: bool,
    events: EventBuffer,
}

impl Cart {
    /// Creates an empty cart for a user, staging a `CartCreated` event.
    pub fn new(user_id: UserId, actor: Actor) -> Self {
        let mut cart = Self {
            user_id: user_id.clone(),
            items: Vec::new(),
            checked_out: false,
            events: EventBuffer::new(),
        };
        cart.stage_event(DomainEvent::record(
            actor,
            ShopEvent::CartCreated(CartCreatedData { user_id }),
        ));
        cart
    }

    /// Adds an item, staging `ItemAdded` for a new product or
    /// `ItemQuantityChanged` when the product is already in the cart.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
        actor: Actor,
    ) -> Result<(), CartError> {
        self.ensure_open()?;
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            let old_quantity = item.quantity;
            item.quantity += quantity;
            let new_quantity = item.quantity;
            self.stage_event(DomainEvent::record(
                actor,
                ShopEvent::ItemQuantityChanged(ItemQuantityChangedData {
                    user_id: self.user_id.clone(),
                    product_id,
                    old_quantity,
                    new_quantity,
                }),
            ));
            return Ok(());
        }

        let product_name = product_name.into();
        self.items.push(CartItem {
            product_id,
            product_name: product_name.clone(),
            quantity,
            unit_price,
        });
        self.stage_event(DomainEvent::record(
            actor,
            ShopEvent::ItemAdded(ItemAddedData {
                user_id: self.user_id.clone(),
                product_id,
                product_name,
                quantity,
                unit_price,
            }),
        ));
        Ok(())
    }

    /// Removes an item, staging an `ItemRemoved` event.
    pub fn remove_item(&mut self, product_id: ProductId, actor: Actor) -> Result<(), CartError> {
        self.ensure_open()?;
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(CartError::ItemNotFound(product_id));
        }

        self.stage_event(DomainEvent::record(
            actor,
            ShopEvent::ItemRemoved(ItemRemovedData {
                user_id: self.user_id.clone(),
                product_id,
            }),
        ));
        Ok(())
    }

    /// Sets an item's quantity, staging an `ItemQuantityChanged` event.
    /// Use [`Cart::remove_item`] to take a product out of the cart.
    pub fn change_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        actor: Actor,
    ) -> Result<(), CartError> {
        self.ensure_open()?;
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) else {
            return Err(CartError::ItemNotFound(product_id));
        };
        let old_quantity = item.quantity;
        if old_quantity == quantity {
            return Ok(());
        }
        item.quantity = quantity;

        self.stage_event(DomainEvent::record(
            actor,
            ShopEvent::ItemQuantityChanged(ItemQuantityChangedData {
                user_id: self.user_id.clone(),
                product_id,
                old_quantity,
                new_quantity: quantity,
            }),
        ));
        Ok(())
    }

    /// Checks the cart out, staging a `CartCheckedOut` event with the
    /// order total.
    pub fn checkout(&mut self, actor: Actor) -> Result<(), CartError> {
        self.ensure_open()?;
        if self.items.is_empty() {
            return Err(CartError::EmptyCart);
        }

        self.checked_out = true;
        self.stage_event(DomainEvent::record(
            actor,
            ShopEvent::CartCheckedOut(CartCheckedOutData {
                user_id: self.user_id.clone(),
                total: self.total(),
                item_count: self.items.len(),
            }),
        ));
        Ok(())
    }

    /// Empties the cart, staging a `CartCleared` event.
    pub fn clear_items(&mut self, actor: Actor) -> Result<(), CartError> {
        self.ensure_open()?;
        self.items.clear();
        self.stage_event(DomainEvent::record(
            actor,
            ShopEvent::CartCleared(CartClearedData {
                user_id: self.user_id.clone(),
            }),
        ));
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), CartError> {
        if self.checked_out {
            return Err(CartError::CheckedOut(self.user_id.clone()));
        }
        Ok(())
    }

    /// Sum of quantity times unit price across all items.
    pub fn total(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(), |acc, item| {
                acc.plus(item.unit_price.times(item.quantity))
            })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_checked_out(&self) -> bool {
        self.checked_out
    }
}

impl EventSource for Cart {
    fn buffer(&self) -> &EventBuffer {
        &self.events
    }

    fn buffer_mut(&mut self) -> &mut EventBuffer {
        &mut self.events
    }
}
