//! HTTP API server for the storefront.
//!
//! Exposes the catalog, favorites, address book, cart and order lifecycle as
//! REST endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Catalog
        .route("/products", get(routes::products::list::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}", patch(routes::products::update::<S>))
        .route("/products/{id}", delete(routes::products::delete::<S>))
        .route("/categories", get(routes::categories::list::<S>))
        .route("/categories", post(routes::categories::create::<S>))
        // Favorites
        .route("/favorites", get(routes::favorites::list::<S>))
        .route("/favorites", post(routes::favorites::add::<S>))
        .route("/favorites/toggle", post(routes::favorites::toggle::<S>))
        .route("/favorites/{product_id}", delete(routes::favorites::remove::<S>))
        // Address book
        .route("/addresses", get(routes::addresses::list::<S>))
        .route("/addresses", post(routes::addresses::create::<S>))
        .route("/addresses/{id}", delete(routes::addresses::delete::<S>))
        // Cart
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/items", post(routes::cart::add::<S>))
        .route("/cart/items/{id}", put(routes::cart::update::<S>))
        .route("/cart/items/{id}", delete(routes::cart::remove::<S>))
        .route("/cart/clear", post(routes::cart::clear::<S>))
        // Orders
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/pay", post(routes::orders::pay::<S>))
        .route("/orders/{id}/confirm", post(routes::orders::confirm::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        // Administration
        .route("/admin/orders", get(routes::admin::list::<S>))
        .route("/admin/orders/{id}", get(routes::admin::get::<S>))
        .route("/admin/orders/{id}/ship", post(routes::admin::ship::<S>))
        .route("/admin/orders/{id}/cancel", post(routes::admin::cancel::<S>))
        .with_state(state)
        .merge(metrics_router)
        .fallback(routes::not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the given store.
pub fn create_default_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}
