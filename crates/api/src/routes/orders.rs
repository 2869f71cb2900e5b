//! Customer order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{AddressId, Order, OrderId, OrderStatus};
use domain::{LineRequest, PlaceOrder};
use serde::Deserialize;
use store::Store;

use super::{AppState, parse_id};
use crate::auth::CurrentUser;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub address_id: AddressId,
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub status: Option<String>,
}

impl ListOrdersParams {
    /// Parses the optional status filter.
    pub fn status(&self) -> Result<Option<OrderStatus>, ApiError> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(|e| ApiError::BadRequest(format!("{e}"))))
            .transpose()
    }
}

// -- Handlers --

/// POST /orders: place an order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let cmd = PlaceOrder::new(user_id, req.address_id, req.items);
    let order = state.orders.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: list the caller's orders, optionally by `?status=`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state.orders.list_orders(user_id, params.status()?).await?;
    Ok(Json(orders))
}

/// GET /orders/{id}: load one of the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id("order", &id)?;
    Ok(Json(state.orders.get_order(id, user.actor()).await?))
}

/// POST /orders/{id}/pay: record payment.
#[tracing::instrument(skip(state))]
pub async fn pay<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id("order", &id)?;
    Ok(Json(state.orders.pay(id, user_id).await?))
}

/// POST /orders/{id}/confirm: confirm receipt.
#[tracing::instrument(skip(state))]
pub async fn confirm<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id("order", &id)?;
    Ok(Json(state.orders.confirm(id, user_id).await?))
}

/// POST /orders/{id}/cancel: cancel a pending or paid order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id("order", &id)?;
    Ok(Json(state.orders.cancel(id, user.actor()).await?))
}
