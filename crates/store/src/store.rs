use async_trait::async_trait;
use common::{
    Address, AddressId, CartItem, CartItemId, Category, CategoryId, Favorite, Order, OrderId,
    Product, ProductId, UserId,
};

use crate::{OrderQuery, Result};

/// An atomic unit of work against the store.
///
/// Reads taken "for update" acquire an exclusive lock on the row that is
/// held until the unit of work ends. Writes become visible to others only
/// on [`commit`](UnitOfWork::commit); dropping the unit of work without
/// committing discards them and releases every lock.
///
/// Callers locking several rows of the same kind must do so in ascending
/// id order.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads an address owned by `owner`.
    async fn address(&mut self, id: AddressId, owner: UserId) -> Result<Option<Address>>;

    /// Reads a product and locks it for the rest of the unit of work.
    ///
    /// Inactive products are returned; the caller decides whether they are
    /// purchasable.
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Adds `delta` (which may be negative) to a product's stock.
    ///
    /// Locks the product if it is not locked yet. Returns the new stock, or
    /// `None` if the product does not exist. Fails with
    /// [`StockUnderflow`](crate::StoreError::StockUnderflow) instead of
    /// going below zero.
    async fn adjust_stock(&mut self, id: ProductId, delta: i64) -> Result<Option<u32>>;

    /// Writes the name, price, active flag and category of an existing
    /// product, locking it if it is not locked yet. Stock is untouched.
    ///
    /// Returns false if the product does not exist.
    async fn save_product_details(&mut self, product: &Product) -> Result<bool>;

    /// Persists a new order header together with all of its items.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Reads an order with its items and locks it for the rest of the unit of work.
    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Persists the mutable part of an order: status, tracking number and
    /// lifecycle timestamps. Items, totals and the shipping snapshot are
    /// never rewritten.
    async fn save_order_status(&mut self, order: &Order) -> Result<()>;

    /// Removes the user's cart rows for any of the given products.
    ///
    /// Returns the number of rows removed.
    async fn remove_cart_items(&mut self, user: UserId, products: &[ProductId]) -> Result<u64>;

    /// Makes every staged change visible and releases all locks.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Core trait for store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Inserts a product, or updates the name, price, active flag and
    /// category of an existing one.
    ///
    /// The stock of an existing product is left alone; only
    /// [`UnitOfWork::adjust_stock`] changes it.
    async fn save_product(&self, product: &Product) -> Result<()>;

    /// Reads a product, active or not.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists active products ordered by name, optionally only those filed
    /// under `category`.
    async fn list_products(&self, category: Option<CategoryId>) -> Result<Vec<Product>>;

    /// Deletes a product.
    ///
    /// Cart rows and favorites for the product are removed and historical
    /// order items lose their product reference. Returns false if it did
    /// not exist.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    /// Inserts a category. Returns false, storing nothing, if its slug is
    /// already taken.
    async fn save_category(&self, category: &Category) -> Result<bool>;

    /// Reads a category.
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>>;

    /// Lists all categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Lists the user's favorites, newest first.
    async fn favorites(&self, user: UserId) -> Result<Vec<Favorite>>;

    /// Marks a product as a favorite of the user.
    ///
    /// Returns the favorite and whether it was created by this call; an
    /// existing favorite is returned unchanged.
    async fn add_favorite(&self, user: UserId, product: ProductId) -> Result<(Favorite, bool)>;

    /// Removes a favorite. Returns false if there was none.
    async fn remove_favorite(&self, user: UserId, product: ProductId) -> Result<bool>;

    /// Inserts or replaces an address.
    async fn save_address(&self, address: &Address) -> Result<()>;

    /// Reads an address owned by `owner`.
    async fn get_address(&self, id: AddressId, owner: UserId) -> Result<Option<Address>>;

    /// Lists the addresses owned by `owner`.
    async fn list_addresses(&self, owner: UserId) -> Result<Vec<Address>>;

    /// Deletes an address owned by `owner`. Returns false if there was none.
    async fn delete_address(&self, id: AddressId, owner: UserId) -> Result<bool>;

    /// Lists the user's cart rows, oldest first.
    async fn cart_items(&self, user: UserId) -> Result<Vec<CartItem>>;

    /// Reads one of the user's cart rows.
    async fn cart_item(&self, user: UserId, id: CartItemId) -> Result<Option<CartItem>>;

    /// Adds `quantity` units of a product to the user's cart.
    ///
    /// Creates the (user, product) row on first add and increments it
    /// afterwards, atomically. Returns `None`, leaving the cart unchanged,
    /// when the resulting quantity would exceed `cap`.
    async fn add_to_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
        cap: u32,
    ) -> Result<Option<CartItem>>;

    /// Sets the quantity of one of the user's cart rows.
    ///
    /// Returns the updated row, or `None` if it does not exist.
    async fn set_cart_quantity(
        &self,
        user: UserId,
        id: CartItemId,
        quantity: u32,
    ) -> Result<Option<CartItem>>;

    /// Deletes one of the user's cart rows. Returns false if there was none.
    async fn delete_cart_item(&self, user: UserId, id: CartItemId) -> Result<bool>;

    /// Deletes all of the user's cart rows, returning how many were removed.
    async fn clear_cart(&self, user: UserId) -> Result<u64>;

    /// Reads an order with its items.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders matching a query, newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Reads a product only if it is active.
    async fn active_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.get_product(id).await?.filter(|p| p.is_active))
    }

    /// Lists the orders of one user, optionally restricted to a status.
    async fn orders_of(
        &self,
        user: UserId,
        status: Option<common::OrderStatus>,
    ) -> Result<Vec<Order>> {
        let mut query = OrderQuery::for_user(user);
        query.status = status;
        self.list_orders(query).await
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
