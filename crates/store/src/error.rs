use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A stock adjustment would have taken a product below zero units.
    #[error("Stock underflow for product {product_id}: stock {stock}, delta {delta}")]
    StockUnderflow {
        product_id: ProductId,
        stock: i64,
        delta: i64,
    },

    /// A persisted value could not be mapped back into the data model.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
