//! Administrator order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{Order, OrderId};
use domain::Actor;
use serde::Deserialize;
use store::Store;

use super::orders::ListOrdersParams;
use super::{AppState, parse_id};
use crate::auth::AdminUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ShipRequest {
    #[serde(default)]
    pub tracking_no: Option<String>,
}

/// GET /admin/orders: list every order, optionally by `?status=`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state.orders.list_all_orders(params.status()?).await?;
    Ok(Json(orders))
}

/// GET /admin/orders/{id}: load any order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id("order", &id)?;
    Ok(Json(state.orders.get_order(id, Actor::Admin).await?))
}

/// POST /admin/orders/{id}/ship: hand a paid order to the carrier.
#[tracing::instrument(skip(state, req))]
pub async fn ship<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<ShipRequest>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id("order", &id)?;
    Ok(Json(state.orders.ship(id, req.tracking_no).await?))
}

/// POST /admin/orders/{id}/cancel: cancel any order not yet completed.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id("order", &id)?;
    Ok(Json(state.orders.cancel(id, Actor::Admin).await?))
}
