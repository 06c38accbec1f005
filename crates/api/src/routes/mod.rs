//! Route handlers and shared application state.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod settlement;

use catalog::CatalogStore;
use checkout::{CartService, LedgerWriter, NotificationService, OrderService};
use ::settlement::{BuyerSettlementView, RollupView, SellerSettlementView};
use storage::{CartRepository, LedgerRepository, OrderRepository};

/// Everything the handlers need from persistence, as one bound.
pub trait MarketStore:
    OrderRepository + LedgerRepository + CartRepository + Clone + 'static
{
}
impl<T> MarketStore for T where
    T: OrderRepository + LedgerRepository + CartRepository + Clone + 'static
{
}

pub trait MarketCatalog: CatalogStore + Clone + 'static {}
impl<T> MarketCatalog for T where T: CatalogStore + Clone + 'static {}

pub trait MarketNotifier: NotificationService + Clone + 'static {}
impl<T> MarketNotifier for T where T: NotificationService + Clone + 'static {}

/// Shared application state accessible from all handlers.
pub struct AppState<S, C, N>
where
    S: MarketStore,
    C: MarketCatalog,
    N: MarketNotifier,
{
    pub writer: LedgerWriter<S, C, N>,
    pub orders: OrderService<S, C>,
    pub carts: CartService<S, C>,
    pub buyers: BuyerSettlementView<S, C>,
    pub sellers: SellerSettlementView<S, C>,
    pub rollups: RollupView<S, C>,
}

impl<S, C, N> AppState<S, C, N>
where
    S: MarketStore,
    C: MarketCatalog,
    N: MarketNotifier,
{
    /// Wires every service onto shared handles of the same backends.
    pub fn new(store: S, catalog: C, notifier: N) -> Self {
        Self {
            writer: LedgerWriter::new(store.clone(), catalog.clone(), notifier),
            orders: OrderService::new(store.clone(), catalog.clone()),
            carts: CartService::new(store.clone(), catalog.clone()),
            buyers: BuyerSettlementView::new(store.clone(), catalog.clone()),
            sellers: SellerSettlementView::new(store.clone(), catalog.clone()),
            rollups: RollupView::new(store, catalog),
        }
    }
}
