//! Cart mutations with catalog availability checks.

use catalog::CatalogStore;
use chrono::Utc;
use common::{BuyerId, ProductId};
use domain::Cart;
use storage::{CartRepository, StorageError};

use crate::{CheckoutError, Result};

/// Retries of the save compare-and-swap before surfacing the conflict.
const SAVE_ATTEMPTS: u32 = 3;

/// Per-buyer cart operations.
///
/// Every mutation re-reads the cart, applies the change and saves under
/// optimistic concurrency; a lost version race is retried transparently.
/// Availability is checked against the catalog on add and on quantity
/// increase, with the unit price snapshotted from the product at add time.
pub struct CartService<S, C>
where
    S: CartRepository,
    C: CatalogStore,
{
    store: S,
    catalog: C,
}

impl<S, C> CartService<S, C>
where
    S: CartRepository,
    C: CatalogStore,
{
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// The buyer's cart, or an empty one if they have none yet.
    pub async fn get_cart(&self, buyer_id: BuyerId) -> Result<Cart> {
        Ok(self
            .store
            .find_cart(buyer_id)
            .await?
            .unwrap_or_else(|| Cart::empty(buyer_id, Utc::now())))
    }

    /// Adds `quantity` of a product, merging into an existing line. The
    /// merged line quantity is checked against current stock.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(CheckoutError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .filter(|p| p.active)
            .ok_or(CheckoutError::ProductUnavailable(product_id))?;

        self.mutate(buyer_id, |cart| {
            let already = cart
                .lines
                .iter()
                .find(|l| l.product_id == product_id)
                .map_or(0, |l| l.quantity);
            let wanted = already + quantity;
            if product.stock < i64::from(wanted) {
                return Err(CheckoutError::InsufficientStock {
                    product_id,
                    requested: wanted,
                    available: product.stock,
                });
            }
            cart.upsert_line(
                product_id,
                product.store_id,
                quantity,
                product.price,
                Utc::now(),
            )?;
            Ok(())
        })
        .await
    }

    /// Sets the quantity of an existing line. A quantity of 0 removes it.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return self.remove_item(buyer_id, product_id).await;
        }

        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .filter(|p| p.active)
            .ok_or(CheckoutError::ProductUnavailable(product_id))?;
        if product.stock < i64::from(quantity) {
            return Err(CheckoutError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            });
        }

        self.mutate(buyer_id, |cart| {
            cart.set_quantity(product_id, quantity, Utc::now())?;
            Ok(())
        })
        .await
    }

    /// Removes a line. Removing an absent product is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, buyer_id: BuyerId, product_id: ProductId) -> Result<Cart> {
        self.mutate(buyer_id, |cart| {
            cart.remove_line(product_id, Utc::now());
            Ok(())
        })
        .await
    }

    /// Empties the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, buyer_id: BuyerId) -> Result<Cart> {
        self.mutate(buyer_id, |cart| {
            cart.clear(Utc::now());
            Ok(())
        })
        .await
    }

    /// Read-modify-write under optimistic concurrency. The closure runs
    /// against a fresh read on every attempt, so a retried mutation sees
    /// whatever the winning session wrote.
    async fn mutate<F>(&self, buyer_id: BuyerId, apply: F) -> Result<Cart>
    where
        F: Fn(&mut Cart) -> Result<()>,
    {
        let mut attempt = 0;
        loop {
            let mut cart = self
                .store
                .find_cart(buyer_id)
                .await?
                .unwrap_or_else(|| Cart::empty(buyer_id, Utc::now()));

            apply(&mut cart)?;

            match self.store.save_cart(&cart).await {
                Ok(version) => {
                    cart.version = version;
                    return Ok(cart);
                }
                Err(StorageError::CartConflict { .. }) if attempt + 1 < SAVE_ATTEMPTS => {
                    attempt += 1;
                    tracing::debug!(%buyer_id, attempt, "cart save lost version race, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
