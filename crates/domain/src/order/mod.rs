//! Order placement and lifecycle.

mod commands;
pub mod lifecycle;
mod service;

pub use commands::{LineRequest, PlaceOrder};
pub use lifecycle::{Actor, OrderAction, Role};
pub use service::OrderService;
