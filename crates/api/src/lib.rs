//! HTTP API server with observability for the marketplace core.
//!
//! Exposes the cart, checkout, order lifecycle, and settlement query
//! surfaces over REST, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use catalog::InMemoryCatalog;
use checkout::InMemoryNotifier;
use metrics_exporter_prometheus::PrometheusHandle;
use storage::MemoryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::{AppState, MarketCatalog, MarketNotifier, MarketStore};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    state: Arc<AppState<S, C, N>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart/{buyer_id}", get(routes::cart::get::<S, C, N>))
        .route("/cart/{buyer_id}", delete(routes::cart::clear::<S, C, N>))
        .route(
            "/cart/{buyer_id}/items",
            post(routes::cart::add_item::<S, C, N>),
        )
        .route(
            "/cart/{buyer_id}/items/{product_id}",
            put(routes::cart::update_quantity::<S, C, N>),
        )
        .route(
            "/cart/{buyer_id}/items/{product_id}",
            delete(routes::cart::remove_item::<S, C, N>),
        )
        .route(
            "/cart/{buyer_id}/checkout",
            post(routes::cart::checkout::<S, C, N>),
        )
        .route("/orders", post(routes::orders::create::<S, C, N>))
        .route("/orders/{id}", get(routes::orders::get::<S, C, N>))
        .route(
            "/orders/{id}/status",
            post(routes::orders::update_status::<S, C, N>),
        )
        .route("/orders/{id}/refund", post(routes::orders::refund::<S, C, N>))
        .route(
            "/buyers/{buyer_id}/orders",
            get(routes::orders::list_for_buyer::<S, C, N>),
        )
        .route(
            "/buyers/{buyer_id}/purchases",
            get(routes::settlement::buyer_purchases::<S, C, N>),
        )
        .route(
            "/buyers/{buyer_id}/summary",
            get(routes::settlement::buyer_summary::<S, C, N>),
        )
        .route(
            "/stores/{store_id}/sales",
            get(routes::settlement::store_sales::<S, C, N>),
        )
        .route(
            "/stores/{store_id}/stats",
            get(routes::settlement::store_stats::<S, C, N>),
        )
        .route(
            "/stores/{store_id}/rollups/monthly",
            get(routes::settlement::store_monthly::<S, C, N>),
        )
        .route(
            "/stores/{store_id}/rollups/products",
            get(routes::settlement::store_products::<S, C, N>),
        )
        .route(
            "/stores/{store_id}/rollups/categories",
            get(routes::settlement::store_categories::<S, C, N>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// In-memory application state for local runs and tests.
pub fn create_memory_state() -> (
    Arc<AppState<MemoryStore, InMemoryCatalog, InMemoryNotifier>>,
    MemoryStore,
    InMemoryCatalog,
) {
    let store = MemoryStore::new();
    let catalog = InMemoryCatalog::new();
    let state = Arc::new(AppState::new(
        store.clone(),
        catalog.clone(),
        InMemoryNotifier::new(),
    ));
    (state, store, catalog)
}
