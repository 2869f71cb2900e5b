//! Shared data model for the storefront order system.
//!
//! Identifiers, money and the plain records exchanged between the store
//! and the domain layer.

pub mod cart;
pub mod catalog;
pub mod money;
pub mod order;
pub mod types;

pub use cart::CartItem;
pub use catalog::{Address, Category, Favorite, Product};
pub use money::Money;
pub use order::{Order, OrderItem, OrderStatus, ParseStatusError, ShippingAddress};
pub use types::{AddressId, CartItemId, CategoryId, OrderId, ProductId, UserId};
