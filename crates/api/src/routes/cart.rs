//! Shopping cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::{CartItem, CartItemId, ProductId};
use domain::CartView;
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, parse_id};
use crate::auth::CurrentUser;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct ClearCartResponse {
    pub removed: u64,
}

// -- Handlers --

/// GET /cart: the caller's cart at current prices.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.cart.cart(user_id).await?))
}

/// POST /cart/items: add units of a product.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartItem>, ApiError> {
    let item = state
        .cart
        .add_item(user_id, req.product_id, req.quantity)
        .await?;
    Ok(Json(item))
}

/// PUT /cart/items/{id}: set a row's quantity; zero removes the row.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Response, ApiError> {
    let id: CartItemId = parse_id("cart item", &id)?;
    let response = match state.cart.update_item(user_id, id, req.quantity).await? {
        Some(item) => Json(item).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}

/// DELETE /cart/items/{id}: remove a row.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: CartItemId = parse_id("cart item", &id)?;
    state.cart.remove_item(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/clear: empty the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ClearCartResponse>, ApiError> {
    let removed = state.cart.clear(user_id).await?;
    Ok(Json(ClearCartResponse { removed }))
}
