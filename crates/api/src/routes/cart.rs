//! Cart endpoints: per-buyer line mutations and the cart-driven checkout.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::CheckoutRequest;
use common::{BuyerId, Money, ProductId};
use domain::{Address, Cart, PaymentMethod, PaymentStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::{AppState, MarketCatalog, MarketNotifier, MarketStore};

use super::orders::OrderResponse;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: uuid::Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct AddressBody {
    pub recipient: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl From<AddressBody> for Address {
    fn from(body: AddressBody) -> Self {
        Address {
            recipient: body.recipient,
            street: body.street,
            city: body.city,
            postal_code: body.postal_code,
            country: body.country,
        }
    }
}

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub shipping_address: AddressBody,
    pub payment_method: String,
    /// Defaults to `pending`; payment processing is outside this service.
    pub payment_status: Option<String>,
    #[serde(default)]
    pub shipping_cost_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    pub idempotency_key: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub store_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// One store's share of the cart, for checkout review.
#[derive(Serialize)]
pub struct StoreGroupResponse {
    pub store_id: String,
    pub subtotal_cents: i64,
    pub line_count: usize,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub buyer_id: String,
    pub lines: Vec<CartLineResponse>,
    pub stores: Vec<StoreGroupResponse>,
    pub total_cents: i64,
    pub version: i64,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        CartResponse {
            buyer_id: cart.buyer_id.to_string(),
            lines: cart
                .lines
                .iter()
                .map(|line| CartLineResponse {
                    product_id: line.product_id.to_string(),
                    store_id: line.store_id.to_string(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    line_total_cents: line.total().cents(),
                })
                .collect(),
            stores: cart
                .group_by_store()
                .into_iter()
                .map(|group| StoreGroupResponse {
                    store_id: group.store_id.to_string(),
                    subtotal_cents: group.subtotal.cents(),
                    line_count: group.lines.len(),
                })
                .collect(),
            total_cents: cart.total_amount.cents(),
            version: cart.version,
        }
    }
}

// -- Handlers --

/// GET /cart/{buyer_id}
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(buyer_id): Path<uuid::Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.get_cart(BuyerId::from_uuid(buyer_id)).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/{buyer_id}/items
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(buyer_id): Path<uuid::Uuid>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .add_item(
            BuyerId::from_uuid(buyer_id),
            ProductId::from_uuid(req.product_id),
            req.quantity,
        )
        .await?;
    Ok(Json(cart.into()))
}

/// PUT /cart/{buyer_id}/items/{product_id}
#[tracing::instrument(skip(state, req))]
pub async fn update_quantity<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path((buyer_id, product_id)): Path<(uuid::Uuid, uuid::Uuid)>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .update_quantity(
            BuyerId::from_uuid(buyer_id),
            ProductId::from_uuid(product_id),
            req.quantity,
        )
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/{buyer_id}/items/{product_id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path((buyer_id, product_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .remove_item(BuyerId::from_uuid(buyer_id), ProductId::from_uuid(product_id))
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/{buyer_id}
#[tracing::instrument(skip(state))]
pub async fn clear<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(buyer_id): Path<uuid::Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.clear_cart(BuyerId::from_uuid(buyer_id)).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/{buyer_id}/checkout
#[tracing::instrument(skip(state, req))]
pub async fn checkout<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(buyer_id): Path<uuid::Uuid>,
    Json(req): Json<CheckoutBody>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let payment_method = PaymentMethod::parse(&req.payment_method)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown payment method: {}", req.payment_method)))?;
    let payment_status = match &req.payment_status {
        Some(s) => PaymentStatus::parse(s)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown payment status: {s}")))?,
        None => PaymentStatus::Pending,
    };

    let order = state
        .writer
        .checkout(CheckoutRequest {
            buyer_id: BuyerId::from_uuid(buyer_id),
            shipping_address: req.shipping_address.into(),
            payment_method,
            payment_status,
            shipping_cost: Money::from_cents(req.shipping_cost_cents),
            tax: Money::from_cents(req.tax_cents),
            idempotency_key: req.idempotency_key,
        })
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(order.into())))
}
