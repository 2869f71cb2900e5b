use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    Address, AddressId, CartItem, CartItemId, Category, CategoryId, Favorite, Order, OrderId,
    Product, ProductId, UserId,
};
use tokio::sync::RwLock;

use crate::{
    OrderQuery, Result, StoreError,
    lock::{KeyGuard, KeyedLocks},
    store::{Store, UnitOfWork},
};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    addresses: HashMap<AddressId, Address>,
    cart: HashMap<CartItemId, CartItem>,
    orders: HashMap<OrderId, Order>,
    categories: HashMap<CategoryId, Category>,
    favorites: HashMap<(UserId, ProductId), Favorite>,
}

/// In-memory store implementation.
///
/// Provides the same locking guarantees as the PostgreSQL implementation:
/// products and orders read "for update" stay locked until the unit of
/// work ends, and staged writes are applied in one write section on
/// commit, before those locks are released.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    product_locks: KeyedLocks<ProductId>,
    order_locks: KeyedLocks<OrderId>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork::new(self.clone())))
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        let _guard = self.product_locks.acquire(&product.id).await;
        let mut tables = self.tables.write().await;
        match tables.products.get_mut(&product.id) {
            Some(existing) => {
                existing.name.clone_from(&product.name);
                existing.price = product.price;
                existing.is_active = product.is_active;
                existing.category_id = product.category_id;
            }
            None => {
                tables.products.insert(product.id, product.clone());
            }
        }
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self, category: Option<CategoryId>) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<_> = tables
            .products
            .values()
            .filter(|p| p.is_active)
            .filter(|p| category.is_none() || p.category_id == category)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let _guard = self.product_locks.acquire(&id).await;
        let mut tables = self.tables.write().await;
        if tables.products.remove(&id).is_none() {
            return Ok(false);
        }

        tables.cart.retain(|_, item| item.product_id != id);
        tables.favorites.retain(|(_, product), _| *product != id);
        for order in tables.orders.values_mut() {
            for item in &mut order.items {
                if item.product_id == Some(id) {
                    item.product_id = None;
                }
            }
        }
        Ok(true)
    }

    async fn save_category(&self, category: &Category) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.slug == category.slug) {
            return Ok(false);
        }
        tables.categories.insert(category.id, category.clone());
        Ok(true)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<_> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<Favorite>> {
        let tables = self.tables.read().await;
        let mut favorites: Vec<_> = tables
            .favorites
            .values()
            .filter(|f| f.user_id == user)
            .cloned()
            .collect();
        favorites.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.product_id.cmp(&a.product_id))
        });
        Ok(favorites)
    }

    async fn add_favorite(&self, user: UserId, product: ProductId) -> Result<(Favorite, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.favorites.get(&(user, product)) {
            return Ok((existing.clone(), false));
        }
        let favorite = Favorite {
            user_id: user,
            product_id: product,
            created_at: Utc::now(),
        };
        tables.favorites.insert((user, product), favorite.clone());
        Ok((favorite, true))
    }

    async fn remove_favorite(&self, user: UserId, product: ProductId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.favorites.remove(&(user, product)).is_some())
    }

    async fn save_address(&self, address: &Address) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.addresses.insert(address.id, address.clone());
        Ok(())
    }

    async fn get_address(&self, id: AddressId, owner: UserId) -> Result<Option<Address>> {
        let tables = self.tables.read().await;
        Ok(tables
            .addresses
            .get(&id)
            .filter(|a| a.user_id == owner)
            .cloned())
    }

    async fn list_addresses(&self, owner: UserId) -> Result<Vec<Address>> {
        let tables = self.tables.read().await;
        let mut addresses: Vec<_> = tables
            .addresses
            .values()
            .filter(|a| a.user_id == owner)
            .cloned()
            .collect();
        addresses.sort_by_key(|a| a.id);
        Ok(addresses)
    }

    async fn delete_address(&self, id: AddressId, owner: UserId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .addresses
            .get(&id)
            .is_some_and(|a| a.user_id == owner);
        if owned {
            tables.addresses.remove(&id);
        }
        Ok(owned)
    }

    async fn cart_items(&self, user: UserId) -> Result<Vec<CartItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<_> = tables
            .cart
            .values()
            .filter(|item| item.user_id == user)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn cart_item(&self, user: UserId, id: CartItemId) -> Result<Option<CartItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart
            .get(&id)
            .filter(|item| item.user_id == user)
            .cloned())
    }

    async fn add_to_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
        cap: u32,
    ) -> Result<Option<CartItem>> {
        let mut tables = self.tables.write().await;

        let existing = tables
            .cart
            .values_mut()
            .find(|item| item.user_id == user && item.product_id == product);

        match existing {
            Some(item) => {
                let combined = item.quantity.checked_add(quantity).filter(|q| *q <= cap);
                Ok(combined.map(|q| {
                    item.quantity = q;
                    item.clone()
                }))
            }
            None if quantity <= cap => {
                let item = CartItem::new(user, product, quantity);
                tables.cart.insert(item.id, item.clone());
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        id: CartItemId,
        quantity: u32,
    ) -> Result<Option<CartItem>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .cart
            .get_mut(&id)
            .filter(|item| item.user_id == user)
            .map(|item| {
                item.quantity = quantity;
                item.clone()
            }))
    }

    async fn delete_cart_item(&self, user: UserId, id: CartItemId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables.cart.get(&id).is_some_and(|item| item.user_id == user);
        if owned {
            tables.cart.remove(&id);
        }
        Ok(owned)
    }

    async fn clear_cart(&self, user: UserId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.cart.len();
        tables.cart.retain(|_, item| item.user_id != user);
        Ok((before - tables.cart.len()) as u64)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();

        // Newest first
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.order_no.cmp(&a.order_no))
        });

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(orders.into_iter().skip(offset).take(limit).collect())
    }
}

/// Unit of work over the in-memory tables.
///
/// Locked rows are copied into the unit of work and mutated there; the
/// copies are written back on commit.
struct MemoryUnitOfWork {
    store: InMemoryStore,
    product_guards: HashMap<ProductId, KeyGuard>,
    order_guards: HashMap<OrderId, KeyGuard>,
    products: HashMap<ProductId, Option<Product>>,
    stock_changes: HashMap<ProductId, u32>,
    detail_changes: HashMap<ProductId, Product>,
    new_orders: Vec<Order>,
    updated_orders: HashMap<OrderId, Order>,
    cart_removals: Vec<(UserId, Vec<ProductId>)>,
}

impl MemoryUnitOfWork {
    fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            product_guards: HashMap::new(),
            order_guards: HashMap::new(),
            products: HashMap::new(),
            stock_changes: HashMap::new(),
            detail_changes: HashMap::new(),
            new_orders: Vec::new(),
            updated_orders: HashMap::new(),
            cart_removals: Vec::new(),
        }
    }

    async fn lock_product(&mut self, id: ProductId) -> Option<&mut Product> {
        if !self.product_guards.contains_key(&id) {
            let guard = self.store.product_locks.acquire(&id).await;
            self.product_guards.insert(id, guard);
            let row = self.store.tables.read().await.products.get(&id).cloned();
            self.products.insert(id, row);
        }
        self.products.get_mut(&id).and_then(Option::as_mut)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn address(&mut self, id: AddressId, owner: UserId) -> Result<Option<Address>> {
        self.store.get_address(id, owner).await
    }

    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.lock_product(id).await.cloned())
    }

    async fn adjust_stock(&mut self, id: ProductId, delta: i64) -> Result<Option<u32>> {
        let Some(product) = self.lock_product(id).await else {
            return Ok(None);
        };

        let stock = i64::from(product.stock);
        let new_stock = stock
            .checked_add(delta)
            .and_then(|s| u32::try_from(s).ok())
            .ok_or(StoreError::StockUnderflow {
                product_id: id,
                stock,
                delta,
            })?;

        product.stock = new_stock;
        self.stock_changes.insert(id, new_stock);
        Ok(Some(new_stock))
    }

    async fn save_product_details(&mut self, product: &Product) -> Result<bool> {
        let Some(locked) = self.lock_product(product.id).await else {
            return Ok(false);
        };

        locked.name.clone_from(&product.name);
        locked.price = product.price;
        locked.is_active = product.is_active;
        locked.category_id = product.category_id;
        let staged = locked.clone();
        self.detail_changes.insert(product.id, staged);
        Ok(true)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.new_orders.push(order.clone());
        Ok(())
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        if !self.order_guards.contains_key(&id) {
            let guard = self.store.order_locks.acquire(&id).await;
            self.order_guards.insert(id, guard);
        }
        if let Some(order) = self.updated_orders.get(&id) {
            return Ok(Some(order.clone()));
        }
        Ok(self.store.tables.read().await.orders.get(&id).cloned())
    }

    async fn save_order_status(&mut self, order: &Order) -> Result<()> {
        self.updated_orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn remove_cart_items(&mut self, user: UserId, products: &[ProductId]) -> Result<u64> {
        let tables = self.store.tables.read().await;
        let staged = tables
            .cart
            .values()
            .filter(|item| item.user_id == user && products.contains(&item.product_id))
            .count();
        drop(tables);

        self.cart_removals.push((user, products.to_vec()));
        Ok(staged as u64)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tables = self.store.tables.write().await;

        for (id, stock) in &self.stock_changes {
            if let Some(product) = tables.products.get_mut(id) {
                product.stock = *stock;
            }
        }

        for (id, staged) in &self.detail_changes {
            if let Some(product) = tables.products.get_mut(id) {
                product.name.clone_from(&staged.name);
                product.price = staged.price;
                product.is_active = staged.is_active;
                product.category_id = staged.category_id;
            }
        }

        for order in &self.new_orders {
            tables.orders.insert(order.id, order.clone());
        }

        for (id, staged) in &self.updated_orders {
            if let Some(order) = tables.orders.get_mut(id) {
                order.status = staged.status;
                order.tracking_no.clone_from(&staged.tracking_no);
                order.paid_at = staged.paid_at;
                order.shipped_at = staged.shipped_at;
                order.completed_at = staged.completed_at;
            }
        }

        for (user, products) in &self.cart_removals {
            tables
                .cart
                .retain(|_, item| !(item.user_id == *user && products.contains(&item.product_id)));
        }

        drop(tables);
        tracing::trace!(
            products = self.product_guards.len(),
            orders = self.order_guards.len(),
            "unit of work committed"
        );
        // Guards drop here, after the writes are visible.
        Ok(())
    }
}
