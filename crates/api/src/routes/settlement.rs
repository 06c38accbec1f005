//! Settlement endpoints: buyer history, seller stats, reporting rollups.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{BuyerId, PageRequest, Paginated, StoreId};
use serde::Deserialize;
use settlement::{
    BuyerSpendSummary, CategoryBreakdown, MonthlyBucket, ProductBreakdown, PurchaseHistoryEntry,
    SaleEntry, SellerSalesStats,
};

use crate::error::ApiError;
use crate::routes::{AppState, MarketCatalog, MarketNotifier, MarketStore};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        let defaults = PageRequest::default();
        PageRequest::new(
            query.page.unwrap_or(defaults.page),
            query.limit.unwrap_or(defaults.limit),
        )
    }
}

/// GET /buyers/{buyer_id}/purchases
#[tracing::instrument(skip(state))]
pub async fn buyer_purchases<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(buyer_id): Path<uuid::Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<PurchaseHistoryEntry>>, ApiError> {
    let page = state
        .buyers
        .purchase_history(BuyerId::from_uuid(buyer_id), page.into())
        .await?;
    Ok(Json(page))
}

/// GET /buyers/{buyer_id}/summary
#[tracing::instrument(skip(state))]
pub async fn buyer_summary<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(buyer_id): Path<uuid::Uuid>,
) -> Result<Json<BuyerSpendSummary>, ApiError> {
    let summary = state
        .buyers
        .spend_summary(BuyerId::from_uuid(buyer_id))
        .await?;
    Ok(Json(summary))
}

/// GET /stores/{store_id}/sales
#[tracing::instrument(skip(state))]
pub async fn store_sales<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(store_id): Path<uuid::Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<SaleEntry>>, ApiError> {
    let page = state
        .sellers
        .sales_page(StoreId::from_uuid(store_id), page.into())
        .await?;
    Ok(Json(page))
}

/// GET /stores/{store_id}/stats
#[tracing::instrument(skip(state))]
pub async fn store_stats<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(store_id): Path<uuid::Uuid>,
) -> Result<Json<SellerSalesStats>, ApiError> {
    let stats = state
        .sellers
        .sales_stats(StoreId::from_uuid(store_id))
        .await?;
    Ok(Json(stats))
}

/// GET /stores/{store_id}/rollups/monthly
#[tracing::instrument(skip(state))]
pub async fn store_monthly<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(store_id): Path<uuid::Uuid>,
) -> Result<Json<Vec<MonthlyBucket>>, ApiError> {
    let months = state
        .rollups
        .monthly_sales(StoreId::from_uuid(store_id))
        .await?;
    Ok(Json(months))
}

/// GET /stores/{store_id}/rollups/products
#[tracing::instrument(skip(state))]
pub async fn store_products<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(store_id): Path<uuid::Uuid>,
) -> Result<Json<Vec<ProductBreakdown>>, ApiError> {
    let breakdown = state
        .rollups
        .product_breakdown(StoreId::from_uuid(store_id))
        .await?;
    Ok(Json(breakdown))
}

/// GET /stores/{store_id}/rollups/categories
#[tracing::instrument(skip(state))]
pub async fn store_categories<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(store_id): Path<uuid::Uuid>,
) -> Result<Json<Vec<CategoryBreakdown>>, ApiError> {
    let breakdown = state
        .rollups
        .category_breakdown(StoreId::from_uuid(store_id))
        .await?;
    Ok(Json(breakdown))
}
