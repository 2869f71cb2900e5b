//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CategoryId, Product, ProductId};
use domain::{NewProduct, ProductPatch};
use serde::Deserialize;
use store::Store;

use super::{AppState, parse_id};
use crate::auth::AdminUser;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListProductsParams {
    pub category: Option<String>,
}

/// GET /products: list purchasable products, optionally by `?category=`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListProductsParams>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let category: Option<CategoryId> = params
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(|c| parse_id("category", c))
        .transpose()?;
    Ok(Json(state.catalog.list_products(category).await?))
}

/// GET /products/{id}: load a purchasable product.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id("product", &id)?;
    Ok(Json(state.catalog.get_product(id).await?))
}

/// POST /products: add a product (admin).
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create_product(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /products/{id}: edit a product or adjust its stock (admin).
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<ProductPatch>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id("product", &id)?;
    Ok(Json(state.catalog.update_product(id, req).await?))
}

/// DELETE /products/{id}: remove a product (admin).
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ProductId = parse_id("product", &id)?;
    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
