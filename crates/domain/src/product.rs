//! Product catalog entity.

use common::Actor;
use thiserror::Error;

use crate::buffer::{EventBuffer, EventSource};
use crate::event::{
    DomainEvent, Money, ProductCreatedData, ProductDeletedData, ProductId,
    ProductPriceChangedData, ProductUpdatedData, ShopEvent,
};

/// Errors from product business rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductError {
    /// Product name must be non-empty.
    #[error("Product name cannot be empty")]
    EmptyName,

    /// Prices cannot be negative.
    #[error("Product price cannot be negative: {0} cents")]
    NegativePrice(i64),

    /// The product has already been retired from the catalog.
    #[error("Product {0} is retired")]
    Retired(ProductId),
}

/// A catalog product.
///
/// Business-rule methods validate, mutate state, and stage the
/// corresponding domain event on the entity's buffer.
#[derive(Debug)]
pub struct Product {
    id: ProductId,
    name: String,
    category: String,
    price: Money,
    retired: bool,
    events: EventBuffer,
}

impl Product {
    /// Creates a product, staging a `ProductCreated` event.
    pub fn create(
        id: ProductId,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Money,
        actor: Actor,
    ) -> Result<Self, ProductError> {
        let name = name.into();
        let category = category.into();
        if name.trim().is_empty() {
            return Err(ProductError::EmptyName);
        }
        if price.is_negative() {
            return Err(ProductError::NegativePrice(price.cents()));
        }

        let mut product = Self {
            id,
            name: name.clone(),
            category: category.clone(),
            price,
            retired: false,
            events: EventBuffer::new(),
        };
        product.stage_event(DomainEvent::record(
            actor,
            ShopEvent::ProductCreated(ProductCreatedData {
                product_id: id,
                name,
                category,
                unit_price: price,
            }),
        ));
        Ok(product)
    }

    /// Updates name and category, staging a `ProductUpdated` event.
    pub fn update_details(
        &mut self,
        name: impl Into<String>,
        category: impl Into<String>,
        actor: Actor,
    ) -> Result<(), ProductError> {
        self.ensure_active()?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProductError::EmptyName);
        }

        self.name = name.clone();
        self.category = category.into();
        self.stage_event(DomainEvent::record(
            actor,
            ShopEvent::ProductUpdated(ProductUpdatedData {
                product_id: self.id,
                name,
                category: self.category.clone(),
            }),
        ));
        Ok(())
    }

    /// Changes the unit price, staging a `ProductPriceChanged` event.
    /// Setting the current price again stages nothing.
    pub fn change_price(&mut self, new_price: Money, actor: Actor) -> Result<(), ProductError> {
        self.ensure_active()?;
        if new_price.is_negative() {
            return Err(ProductError::NegativePrice(new_price.cents()));
        }
        if new_price == self.price {
            return Ok(());
        }

        let old_price = self.price;
        self.price = new_price;
        self.stage_event(DomainEvent::record(
            actor,
            ShopEvent::ProductPriceChanged(ProductPriceChangedData {
                product_id: self.id,
                old_price,
                new_price,
            }),
        ));
        Ok(())
    }

    /// Retires the product from the catalog, staging a `ProductDeleted`
    /// event.
    pub fn retire(&mut self, actor: Actor) -> Result<(), ProductError> {
        self.ensure_active()?;
        self.retired = true;
        self.stage_event(DomainEvent::record(
            actor,
            ShopEvent::ProductDeleted(ProductDeletedData { product_id: self.id }),
        ));
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), ProductError> {
        if self.retired {
            return Err(ProductError::Retired(self.id));
        }
        Ok(())
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

impl EventSource for Product {
    fn buffer(&self) -> &EventBuffer {
        &self.events
    }

    fn buffer_mut(&mut self) -> &mut EventBuffer {
        &mut self.events
    }
}
