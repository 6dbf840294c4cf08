//! Carts service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::domain::{
    carts::{
        errors::CartsServiceError,
        models::{Cart, CartLine, CustomerUuid},
    },
    catalog::{CatalogService, ProductUuid},
};

/// In-process cart state, one cart per customer. Version counters are
/// monotonic for the life of the process; `clear` empties a cart but never
/// resets its counter, so an order's cart snapshot can never be confused
/// with a later cart that happens to reach the same version.
pub struct CartStore {
    catalog: Arc<dyn CatalogService>,
    carts: Mutex<FxHashMap<CustomerUuid, Cart>>,
    line_quantity_cap: u32,
}

impl CartStore {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogService>, line_quantity_cap: u32) -> Self {
        Self {
            catalog,
            carts: Mutex::new(FxHashMap::default()),
            line_quantity_cap,
        }
    }

    fn check_quantity(&self, quantity: u32) -> Result<(), CartsServiceError> {
        if quantity == 0 || quantity > self.line_quantity_cap {
            return Err(CartsServiceError::InvalidQuantity);
        }

        Ok(())
    }
}

#[async_trait]
impl CartsService for CartStore {
    async fn get_cart(&self, customer: CustomerUuid) -> Cart {
        self.carts
            .lock()
            .await
            .get(&customer)
            .cloned()
            .unwrap_or_else(|| Cart::empty(customer))
    }

    async fn add_line(
        &self,
        customer: CustomerUuid,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError> {
        self.check_quantity(quantity)?;

        // Price snapshot is taken once, when the line first appears.
        let listing = self.catalog.get_product(product).await?;

        let mut carts = self.carts.lock().await;
        let cart = carts
            .entry(customer)
            .or_insert_with(|| Cart::empty(customer));

        match cart.lines.iter_mut().find(|line| line.product == product) {
            Some(line) => {
                let merged = line.quantity.saturating_add(quantity);

                if merged > self.line_quantity_cap {
                    return Err(CartsServiceError::InvalidQuantity);
                }

                line.quantity = merged;
            }
            None => cart.lines.push(CartLine {
                product,
                quantity,
                unit_price: listing.price,
            }),
        }

        cart.version += 1;
        cart.updated_at = Timestamp::now();

        Ok(cart.clone())
    }

    async fn update_line(
        &self,
        customer: CustomerUuid,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError> {
        self.check_quantity(quantity)?;

        let mut carts = self.carts.lock().await;
        let cart = carts
            .get_mut(&customer)
            .ok_or(CartsServiceError::LineNotFound)?;

        let line = cart
            .lines
            .iter_mut()
            .find(|line| line.product == product)
            .ok_or(CartsServiceError::LineNotFound)?;

        line.quantity = quantity;

        cart.version += 1;
        cart.updated_at = Timestamp::now();

        Ok(cart.clone())
    }

    async fn remove_line(
        &self,
        customer: CustomerUuid,
        product: ProductUuid,
    ) -> Result<Cart, CartsServiceError> {
        let mut carts = self.carts.lock().await;
        let cart = carts
            .get_mut(&customer)
            .ok_or(CartsServiceError::LineNotFound)?;

        let before = cart.lines.len();
        cart.lines.retain(|line| line.product != product);

        if cart.lines.len() == before {
            return Err(CartsServiceError::LineNotFound);
        }

        cart.version += 1;
        cart.updated_at = Timestamp::now();

        Ok(cart.clone())
    }

    async fn clear(
        &self,
        customer: CustomerUuid,
        expected_version: u64,
    ) -> Result<(), CartsServiceError> {
        let mut carts = self.carts.lock().await;

        let Some(cart) = carts.get_mut(&customer) else {
            if expected_version == 0 {
                return Ok(());
            }

            return Err(CartsServiceError::VersionConflict);
        };

        if cart.version != expected_version {
            return Err(CartsServiceError::VersionConflict);
        }

        cart.lines.clear();
        cart.version += 1;
        cart.updated_at = Timestamp::now();

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve a customer's cart; an absent cart reads as empty at version 0.
    async fn get_cart(&self, customer: CustomerUuid) -> Cart;

    /// Add `quantity` of a product, merging with an existing line.
    async fn add_line(
        &self,
        customer: CustomerUuid,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError>;

    /// Replace the quantity on an existing line.
    async fn update_line(
        &self,
        customer: CustomerUuid,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError>;

    /// Remove a line entirely.
    async fn remove_line(
        &self,
        customer: CustomerUuid,
        product: ProductUuid,
    ) -> Result<Cart, CartsServiceError>;

    /// Empty the cart, but only if it has not moved past `expected_version`.
    /// Called by the checkout coordinator once the cart's content has been
    /// committed to an order.
    async fn clear(
        &self,
        customer: CustomerUuid,
        expected_version: u64,
    ) -> Result<(), CartsServiceError>;
}
