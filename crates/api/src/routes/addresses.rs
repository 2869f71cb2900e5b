//! Address book endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Address, AddressId};
use domain::NewAddress;
use store::Store;

use super::{AppState, parse_id};
use crate::auth::CurrentUser;
use crate::error::ApiError;

/// GET /addresses: list the caller's addresses.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Address>>, ApiError> {
    Ok(Json(state.catalog.addresses(user_id).await?))
}

/// POST /addresses: add an address.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<NewAddress>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    let address = state.catalog.add_address(user_id, req).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// DELETE /addresses/{id}: remove one of the caller's addresses.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: AddressId = parse_id("address", &id)?;
    state.catalog.delete_address(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
