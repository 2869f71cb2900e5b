//! Domain layer for the storefront.
//!
//! This crate provides the business rules on top of the store:
//! - Inventory-safe order placement
//! - The order lifecycle state machine with stock restitution on cancel
//! - Cart maintenance with advisory stock checks
//! - Catalog, category, favorites and address book maintenance

pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;

pub use cart::{CartLine, CartService, CartView};
pub use catalog::{
    CatalogService, FavoriteProduct, NewAddress, NewCategory, NewProduct, ProductPatch,
};
pub use error::{DomainError, Result};
pub use order::{Actor, LineRequest, OrderAction, OrderService, PlaceOrder, Role};
