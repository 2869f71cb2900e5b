//! Transactional persistence for the storefront.
//!
//! [`Store`] is the shared handle used for plain reads and single-row
//! writes. Multi-row changes that must be all-or-nothing go through a
//! [`UnitOfWork`] obtained from [`Store::begin`], which also provides the
//! exclusive row locks that serialize stock checks and order transitions.

pub mod error;
pub mod lock;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::OrderQuery;
pub use store::{Store, StoreExt, UnitOfWork};
