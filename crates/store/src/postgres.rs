use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    Address, AddressId, CartItem, CartItemId, Category, CategoryId, Favorite, Money, Order,
    OrderId, OrderItem, OrderStatus, Product, ProductId, ShippingAddress, UserId,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    OrderQuery, Result, StoreError,
    store::{Store, UnitOfWork},
};

const PRODUCT_COLUMNS: &str = "id, name, price, stock, is_active, category_id";

const FAVORITE_COLUMNS: &str = "user_id, product_id, created_at";

const ADDRESS_COLUMNS: &str =
    "id, user_id, recipient_name, phone, province, city, district, street";

const CART_COLUMNS: &str = "id, user_id, product_id, quantity, added_at";

const ORDER_COLUMNS: &str = "id, order_no, user_id, status, total_amount, \
     shipping_name, shipping_phone, shipping_province, shipping_city, shipping_district, \
     shipping_street, tracking_no, created_at, paid_at, shipped_at, completed_at";

/// PostgreSQL-backed store implementation.
///
/// Each unit of work is a database transaction; rows read "for update" are
/// locked with `SELECT ... FOR UPDATE` until it commits or rolls back.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `url` with a pool of at most `max_connections`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn to_db_count(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::InvalidData(format!("count {value} out of range")))
}

fn from_db_count(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("negative {column}: {value}")))
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        price: Money::new(row.try_get::<Decimal, _>("price")?),
        stock: from_db_count(row.try_get("stock")?, "stock")?,
        is_active: row.try_get("is_active")?,
        category_id: row
            .try_get::<Option<Uuid>, _>("category_id")?
            .map(CategoryId::from_uuid),
    })
}

fn row_to_category(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
    })
}

fn row_to_favorite(row: &PgRow) -> Result<Favorite> {
    Ok(Favorite {
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_address(row: &PgRow) -> Result<Address> {
    Ok(Address {
        id: AddressId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        recipient_name: row.try_get("recipient_name")?,
        phone: row.try_get("phone")?,
        province: row.try_get("province")?,
        city: row.try_get("city")?,
        district: row.try_get("district")?,
        street: row.try_get("street")?,
    })
}

fn row_to_cart_item(row: &PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: CartItemId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: from_db_count(row.try_get("quantity")?, "quantity")?,
        added_at: row.try_get("added_at")?,
    })
}

fn row_to_order_header(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::InvalidData(e.to_string()))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        order_no: row.try_get("order_no")?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        status,
        total_amount: Money::new(row.try_get::<Decimal, _>("total_amount")?),
        shipping: ShippingAddress {
            recipient_name: row.try_get("shipping_name")?,
            phone: row.try_get("shipping_phone")?,
            province: row.try_get("shipping_province")?,
            city: row.try_get("shipping_city")?,
            district: row.try_get("shipping_district")?,
            street: row.try_get("shipping_street")?,
        },
        tracking_no: row.try_get("tracking_no")?,
        items: Vec::new(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        paid_at: row.try_get("paid_at")?,
        shipped_at: row.try_get("shipped_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn row_to_order_item(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        product_id: row
            .try_get::<Option<Uuid>, _>("product_id")?
            .map(ProductId::from_uuid),
        product_name: row.try_get("product_name")?,
        unit_price: Money::new(row.try_get::<Decimal, _>("unit_price")?),
        quantity: from_db_count(row.try_get("quantity")?, "quantity")?,
    })
}

/// Loads the items of the given orders and attaches them in line order.
async fn attach_items(conn: &mut PgConnection, orders: &mut [Order]) -> Result<()> {
    if orders.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
    let rows = sqlx::query(
        r#"
        SELECT order_id, product_id, product_name, unit_price, quantity
        FROM order_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, position ASC
        "#,
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in &rows {
        let order_id: Uuid = row.try_get("order_id")?;
        items.entry(order_id).or_default().push(row_to_order_item(row)?);
    }

    for order in orders.iter_mut() {
        order.items = items.remove(&order.id.as_uuid()).unwrap_or_default();
    }
    Ok(())
}

async fn fetch_order(conn: &mut PgConnection, id: OrderId, for_update: bool) -> Result<Option<Order>> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{lock}");

    let row = sqlx::query(&sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let mut orders = [row_to_order_header(&row)?];
            attach_items(conn, &mut orders).await?;
            let [order] = orders;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

async fn fetch_address(
    conn: &mut PgConnection,
    id: AddressId,
    owner: UserId,
) -> Result<Option<Address>> {
    let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2");
    let row = sqlx::query(&sql)
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(row_to_address).transpose()
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, stock, is_active, category_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                is_active = EXCLUDED.is_active,
                category_id = EXCLUDED.category_id
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(to_db_count(product.stock)?)
        .bind(product.is_active)
        .bind(product.category_id.map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_products(&self, category: Option<CategoryId>) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active AND ($1::UUID IS NULL OR category_id = $1) \
             ORDER BY name, id"
        );
        let rows = sqlx::query(&sql)
            .bind(category.map(|id| id.as_uuid()))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        // Cart rows and favorites cascade; order items are detached by ON DELETE SET NULL.
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_category(&self, category: &Category) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT unique_category_slug DO NOTHING
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name, slug FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_category).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, slug FROM categories ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_category).collect()
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<Favorite>> {
        let sql = format!(
            "SELECT {FAVORITE_COLUMNS} FROM favorites WHERE user_id = $1 \
             ORDER BY created_at DESC, product_id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_favorite).collect()
    }

    async fn add_favorite(&self, user: UserId, product: ProductId) -> Result<(Favorite, bool)> {
        let insert = format!(
            r#"
            INSERT INTO favorites (user_id, product_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO NOTHING
            RETURNING {FAVORITE_COLUMNS}
            "#
        );
        let inserted = sqlx::query(&insert)
            .bind(user.as_uuid())
            .bind(product.as_uuid())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = inserted {
            return Ok((row_to_favorite(&row)?, true));
        }

        let select =
            format!("SELECT {FAVORITE_COLUMNS} FROM favorites WHERE user_id = $1 AND product_id = $2");
        let row = sqlx::query(&select)
            .bind(user.as_uuid())
            .bind(product.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok((row_to_favorite(&row)?, false))
    }

    async fn remove_favorite(&self, user: UserId, product: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
            .bind(user.as_uuid())
            .bind(product.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_address(&self, address: &Address) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO addresses (id, user_id, recipient_name, phone, province, city, district, street)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                recipient_name = EXCLUDED.recipient_name,
                phone = EXCLUDED.phone,
                province = EXCLUDED.province,
                city = EXCLUDED.city,
                district = EXCLUDED.district,
                street = EXCLUDED.street
            WHERE addresses.user_id = EXCLUDED.user_id
            "#,
        )
        .bind(address.id.as_uuid())
        .bind(address.user_id.as_uuid())
        .bind(&address.recipient_name)
        .bind(&address.phone)
        .bind(&address.province)
        .bind(&address.city)
        .bind(&address.district)
        .bind(&address.street)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_address(&self, id: AddressId, owner: UserId) -> Result<Option<Address>> {
        let mut conn = self.pool.acquire().await?;
        fetch_address(&mut conn, id, owner).await
    }

    async fn list_addresses(&self, owner: UserId) -> Result<Vec<Address>> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_address).collect()
    }

    async fn delete_address(&self, id: AddressId, owner: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(owner.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cart_items(&self, user: UserId) -> Result<Vec<CartItem>> {
        let sql =
            format!("SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY added_at, id");
        let rows = sqlx::query(&sql)
            .bind(user.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_cart_item).collect()
    }

    async fn cart_item(&self, user: UserId, id: CartItemId) -> Result<Option<CartItem>> {
        let sql = format!("SELECT {CART_COLUMNS} FROM cart_items WHERE id = $1 AND user_id = $2");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(user.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_cart_item).transpose()
    }

    async fn add_to_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
        cap: u32,
    ) -> Result<Option<CartItem>> {
        if quantity > cap {
            return Ok(None);
        }

        // The conditional DO UPDATE returns no row when the cap would be exceeded.
        let sql = format!(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity, added_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT unique_cart_product DO UPDATE
                SET quantity = cart_items.quantity + EXCLUDED.quantity
                WHERE cart_items.quantity::BIGINT + EXCLUDED.quantity <= $6
            RETURNING {CART_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(CartItemId::new().as_uuid())
            .bind(user.as_uuid())
            .bind(product.as_uuid())
            .bind(to_db_count(quantity)?)
            .bind(Utc::now())
            .bind(i64::from(cap))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_cart_item).transpose()
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        id: CartItemId,
        quantity: u32,
    ) -> Result<Option<CartItem>> {
        let sql = format!(
            "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2 RETURNING {CART_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(user.as_uuid())
            .bind(to_db_count(quantity)?)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_cart_item).transpose()
    }

    async fn delete_cart_item(&self, user: UserId, id: CartItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id, false).await
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, order_no DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(user_id) = query.user_id {
            sqlx_query = sqlx_query.bind(user_id.as_uuid());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let mut conn = self.pool.acquire().await?;
        let rows = sqlx_query.fetch_all(&mut *conn).await?;
        let mut orders = rows
            .iter()
            .map(row_to_order_header)
            .collect::<Result<Vec<_>>>()?;
        attach_items(&mut conn, &mut orders).await?;
        Ok(orders)
    }
}

/// Unit of work backed by a PostgreSQL transaction.
///
/// Dropping it without committing rolls the transaction back.
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn address(&mut self, id: AddressId, owner: UserId) -> Result<Option<Address>> {
        fetch_address(&mut self.tx, id, owner).await
    }

    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn adjust_stock(&mut self, id: ProductId, delta: i64) -> Result<Option<u32>> {
        let Some(product) = self.product_for_update(id).await? else {
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

        sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(to_db_count(new_stock)?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("products_stock_non_negative")
                {
                    return StoreError::StockUnderflow {
                        product_id: id,
                        stock,
                        delta,
                    };
                }
                StoreError::Database(e)
            })?;

        Ok(Some(new_stock))
    }

    async fn save_product_details(&mut self, product: &Product) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, price = $3, is_active = $4, category_id = $5
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(product.is_active)
        .bind(product.category_id.map(|id| id.as_uuid()))
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_no, user_id, status, total_amount,
                shipping_name, shipping_phone, shipping_province, shipping_city,
                shipping_district, shipping_street, tracking_no,
                created_at, paid_at, shipped_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_no)
        .bind(order.user_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.total_amount.amount())
        .bind(&order.shipping.recipient_name)
        .bind(&order.shipping.phone)
        .bind(&order.shipping.province)
        .bind(&order.shipping.city)
        .bind(&order.shipping.district)
        .bind(&order.shipping.street)
        .bind(&order.tracking_no)
        .bind(order.created_at)
        .bind(order.paid_at)
        .bind(order.shipped_at)
        .bind(order.completed_at)
        .execute(&mut *self.tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| StoreError::InvalidData("too many order items".to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position)
            .bind(item.product_id.map(|id| id.as_uuid()))
            .bind(&item.product_name)
            .bind(item.unit_price.amount())
            .bind(to_db_count(item.quantity)?)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        fetch_order(&mut self.tx, id, true).await
    }

    async fn save_order_status(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, tracking_no = $3, paid_at = $4, shipped_at = $5, completed_at = $6
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(&order.tracking_no)
        .bind(order.paid_at)
        .bind(order.shipped_at)
        .bind(order.completed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn remove_cart_items(&mut self, user: UserId, products: &[ProductId]) -> Result<u64> {
        let ids: Vec<Uuid> = products.iter().map(|id| id.as_uuid()).collect();
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
            .bind(user.as_uuid())
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
