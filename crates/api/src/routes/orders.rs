//! Order endpoints: direct creation, lookup, status transitions, refunds.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::{LineRequest, OrderRequest};
use common::{BuyerId, Money, OrderId, ProductId};
use domain::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::cart::AddressBody;
use crate::routes::{AppState, MarketCatalog, MarketNotifier, MarketStore};

// -- Request types --

#[derive(Deserialize)]
pub struct OrderLineBody {
    pub product_id: uuid::Uuid,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct CreateOrderBody {
    pub buyer_id: uuid::Uuid,
    pub lines: Vec<OrderLineBody>,
    pub shipping_address: AddressBody,
    pub payment_method: String,
    pub payment_status: Option<String>,
    #[serde(default)]
    pub shipping_cost_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    pub idempotency_key: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
    pub actor: Option<String>,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct RefundBody {
    pub notes: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub store_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub buyer_id: String,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub line_items: Vec<OrderLineResponse>,
    pub subtotal_cents: i64,
    pub shipping_cost_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub ordered_at: String,
    pub shipped_at: Option<String>,
    pub delivered_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub cancel_reason: Option<String>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id.to_string(),
            order_number: order.order_number.as_str().to_string(),
            buyer_id: order.buyer_id.to_string(),
            status: order.status.to_string(),
            payment_method: order.payment_method.to_string(),
            payment_status: order.payment_status.to_string(),
            line_items: order
                .line_items
                .iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    store_id: line.store_id.to_string(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    total_cents: line.total.cents(),
                })
                .collect(),
            subtotal_cents: order.subtotal.cents(),
            shipping_cost_cents: order.shipping_cost.cents(),
            tax_cents: order.tax.cents(),
            total_cents: order.total.cents(),
            ordered_at: order.ordered_at.to_rfc3339(),
            shipped_at: order.shipped_at.map(|t| t.to_rfc3339()),
            delivered_at: order.delivered_at.map(|t| t.to_rfc3339()),
            cancelled_at: order.cancelled_at.map(|t| t.to_rfc3339()),
            cancel_reason: order.cancel_reason,
        }
    }
}

// -- Handlers --

/// POST /orders
#[tracing::instrument(skip(state, req))]
pub async fn create<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Json(req): Json<CreateOrderBody>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let payment_method = PaymentMethod::parse(&req.payment_method).ok_or_else(|| {
        ApiError::BadRequest(format!("Unknown payment method: {}", req.payment_method))
    })?;
    let payment_status = match &req.payment_status {
        Some(s) => PaymentStatus::parse(s)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown payment status: {s}")))?,
        None => PaymentStatus::Pending,
    };

    let order = state
        .writer
        .create_order(OrderRequest {
            buyer_id: BuyerId::from_uuid(req.buyer_id),
            lines: req
                .lines
                .iter()
                .map(|line| LineRequest {
                    product_id: ProductId::from_uuid(line.product_id),
                    quantity: line.quantity,
                    unit_price: Money::from_cents(line.unit_price_cents),
                })
                .collect(),
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

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.get_order(OrderId::from_uuid(id)).await?;
    Ok(Json(order.into()))
}

/// GET /buyers/{buyer_id}/orders
#[tracing::instrument(skip(state))]
pub async fn list_for_buyer<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(buyer_id): Path<uuid::Uuid>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .orders
        .orders_for_buyer(BuyerId::from_uuid(buyer_id))
        .await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// POST /orders/{id}/status
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateStatusBody>,
) -> Result<Json<OrderResponse>, ApiError> {
    let target = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown order status: {}", req.status)))?;

    let order = state
        .orders
        .update_status(OrderId::from_uuid(id), target, req.actor, req.reason)
        .await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/refund
#[tracing::instrument(skip(state, req))]
pub async fn refund<S: MarketStore, C: MarketCatalog, N: MarketNotifier>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<RefundBody>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .refund_order(OrderId::from_uuid(id), req.notes)
        .await?;
    Ok(Json(order.into()))
}
