//! Favorites endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::FavoriteProduct;
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, parse_id};
use crate::auth::CurrentUser;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct FavoriteRequest {
    pub product_id: Option<ProductId>,
}

impl FavoriteRequest {
    fn product_id(&self) -> Result<ProductId, ApiError> {
        self.product_id
            .ok_or_else(|| ApiError::BadRequest("product_id is required".to_string()))
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct ToggleResponse {
    pub is_favorited: bool,
}

// -- Handlers --

/// GET /favorites: the caller's favorite products, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<FavoriteProduct>>, ApiError> {
    Ok(Json(state.catalog.favorites(user_id).await?))
}

/// POST /favorites: favorite a product. 201 when new, 200 when it already was.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<FavoriteRequest>,
) -> Result<(StatusCode, Json<FavoriteProduct>), ApiError> {
    let product_id = req.product_id()?;
    let (favorite, created) = state.catalog.add_favorite(user_id, product_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(favorite)))
}

/// DELETE /favorites/{product_id}: unfavorite a product.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id: ProductId = parse_id("product", &product_id)?;
    state.catalog.remove_favorite(user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /favorites/toggle: flip a product's favorite state.
#[tracing::instrument(skip(state, req))]
pub async fn toggle<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<FavoriteRequest>,
) -> Result<(StatusCode, Json<ToggleResponse>), ApiError> {
    let product_id = req.product_id()?;
    let is_favorited = state.catalog.toggle_favorite(user_id, product_id).await?;
    let status = if is_favorited {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ToggleResponse { is_favorited })))
}
