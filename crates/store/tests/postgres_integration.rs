//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{
    Address, AddressId, Category, Money, Order, OrderId, OrderItem, OrderStatus, Product,
    ProductId, ShippingAddress, UserId,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{OrderQuery, PostgresStore, Store, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_storefront_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/002_add_categories_and_favorites.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE favorites, order_items, orders, cart_items, addresses, products, categories")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

async fn seed_product(store: &PostgresStore, name: &str, cents: i64, stock: u32) -> Product {
    let product = Product::new(name, Money::from_cents(cents), stock);
    store.save_product(&product).await.unwrap();
    product
}

fn test_order(user: UserId, product: &Product, quantity: u32) -> Order {
    let item = OrderItem {
        product_id: Some(product.id),
        product_name: product.name.clone(),
        unit_price: product.price,
        quantity,
    };
    Order {
        id: OrderId::new(),
        order_no: format!("{}{:06}", Utc::now().format("%Y%m%d%H%M%S"), quantity),
        user_id: user,
        status: OrderStatus::Pending,
        total_amount: item.subtotal().unwrap(),
        shipping: ShippingAddress {
            recipient_name: "Ada".to_string(),
            phone: "555-0100".to_string(),
            province: "North".to_string(),
            city: "Springfield".to_string(),
            district: "Central".to_string(),
            street: "1 Main St".to_string(),
        },
        tracking_no: None,
        items: vec![item],
        created_at: Utc::now(),
        paid_at: None,
        shipped_at: None,
        completed_at: None,
    }
}

#[tokio::test]
#[serial]
async fn product_round_trip_keeps_exact_price() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1999, 5).await;

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.price, Money::from_cents(1999));
    assert_eq!(loaded.stock, 5);
    assert!(loaded.is_active);
}

#[tokio::test]
#[serial]
async fn stock_changes_commit_atomically() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 5).await;

    let mut uow = store.begin().await.unwrap();
    assert_eq!(uow.adjust_stock(product.id, -3).await.unwrap(), Some(2));
    uow.commit().await.unwrap();

    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
#[serial]
async fn dropped_unit_of_work_rolls_back() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 5).await;
    let user = UserId::new();

    {
        let mut uow = store.begin().await.unwrap();
        uow.adjust_stock(product.id, -5).await.unwrap();
        uow.insert_order(&test_order(user, &product, 5)).await.unwrap();
    }

    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 5);
    assert!(store.list_orders(OrderQuery::new()).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn stock_never_goes_negative() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 2).await;

    let mut uow = store.begin().await.unwrap();
    let result = uow.adjust_stock(product.id, -3).await;
    assert!(matches!(result, Err(StoreError::StockUnderflow { .. })));
    assert_eq!(uow.adjust_stock(ProductId::new(), -1).await.unwrap(), None);
}

#[tokio::test]
#[serial]
async fn row_lock_blocks_second_unit_of_work() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 1).await;

    let mut first = store.begin().await.unwrap();
    first.product_for_update(product.id).await.unwrap();

    let contender = {
        let store = store.clone();
        let id = product.id;
        tokio::spawn(async move {
            let mut uow = store.begin().await.unwrap();
            let seen = uow.product_for_update(id).await.unwrap().unwrap();
            seen.stock
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!contender.is_finished());

    first.adjust_stock(product.id, -1).await.unwrap();
    first.commit().await.unwrap();

    assert_eq!(contender.await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn orders_round_trip_with_items_and_status() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1250, 10).await;
    let user = UserId::new();
    let order = test_order(user, &product, 3);

    let mut uow = store.begin().await.unwrap();
    uow.insert_order(&order).await.unwrap();
    uow.commit().await.unwrap();

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(loaded.items[0].unit_price, Money::from_cents(1250));
    assert_eq!(loaded.total_amount, Money::from_cents(3750));
    assert_eq!(loaded.status, OrderStatus::Pending);

    let mut uow = store.begin().await.unwrap();
    let mut locked = uow.order_for_update(order.id).await.unwrap().unwrap();
    locked.status = OrderStatus::Paid;
    locked.paid_at = Some(Utc::now());
    uow.save_order_status(&locked).await.unwrap();
    uow.commit().await.unwrap();

    let paid = store
        .list_orders(OrderQuery::for_user(user).status(OrderStatus::Paid))
        .await
        .unwrap();
    assert_eq!(paid.len(), 1);
    assert!(paid[0].paid_at.is_some());
    assert_eq!(paid[0].items.len(), 1);
}

#[tokio::test]
#[serial]
async fn cart_add_increments_up_to_cap() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 5).await;
    let user = UserId::new();

    let first = store.add_to_cart(user, product.id, 2, 5).await.unwrap().unwrap();
    let second = store.add_to_cart(user, product.id, 3, 5).await.unwrap().unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.quantity, 5);

    assert!(store.add_to_cart(user, product.id, 1, 5).await.unwrap().is_none());
    assert_eq!(store.cart_items(user).await.unwrap()[0].quantity, 5);
}

#[tokio::test]
#[serial]
async fn deleting_product_detaches_history() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 5).await;
    let user = UserId::new();
    let order = test_order(user, &product, 1);

    store.add_to_cart(user, product.id, 1, 5).await.unwrap();
    let mut uow = store.begin().await.unwrap();
    uow.insert_order(&order).await.unwrap();
    uow.commit().await.unwrap();

    assert!(store.delete_product(product.id).await.unwrap());

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.items[0].product_id, None);
    assert_eq!(loaded.items[0].product_name, "Widget");
    assert!(store.cart_items(user).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn addresses_are_scoped_to_owner() {
    let store = get_test_store().await;
    let owner = UserId::new();
    let address = Address {
        id: AddressId::new(),
        user_id: owner,
        recipient_name: "Ada".to_string(),
        phone: "555-0100".to_string(),
        province: "North".to_string(),
        city: "Springfield".to_string(),
        district: "Central".to_string(),
        street: "1 Main St".to_string(),
    };
    store.save_address(&address).await.unwrap();

    assert!(store.get_address(address.id, owner).await.unwrap().is_some());
    assert!(store.get_address(address.id, UserId::new()).await.unwrap().is_none());
    assert!(!store.delete_address(address.id, UserId::new()).await.unwrap());
    assert!(store.delete_address(address.id, owner).await.unwrap());
}

#[tokio::test]
#[serial]
async fn product_details_commit_with_stock() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 5).await;
    let mut edited = product.clone();
    edited.name = "Widget Pro".to_string();
    edited.price = Money::from_cents(1250);

    {
        let mut uow = store.begin().await.unwrap();
        uow.adjust_stock(product.id, -1).await.unwrap();
        assert!(uow.save_product_details(&edited).await.unwrap());
    }
    let untouched = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(untouched, product);

    let mut uow = store.begin().await.unwrap();
    uow.adjust_stock(product.id, -1).await.unwrap();
    assert!(uow.save_product_details(&edited).await.unwrap());
    uow.commit().await.unwrap();

    let stored = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Widget Pro");
    assert_eq!(stored.price, Money::from_cents(1250));
    assert_eq!(stored.stock, 4);
}

#[tokio::test]
#[serial]
async fn categories_have_unique_slugs_and_filter_products() {
    let store = get_test_store().await;
    let books = Category::new("Books", "books");
    assert!(store.save_category(&books).await.unwrap());
    assert!(!store.save_category(&Category::new("Also Books", "books")).await.unwrap());

    let novel = Product::new("Novel", Money::from_cents(1999), 3).with_category(books.id);
    store.save_product(&novel).await.unwrap();
    seed_product(&store, "Lamp", 2999, 1).await;

    assert_eq!(store.list_categories().await.unwrap(), vec![books.clone()]);
    assert_eq!(store.list_products(None).await.unwrap().len(), 2);
    assert_eq!(store.list_products(Some(books.id)).await.unwrap(), vec![novel]);
}

#[tokio::test]
#[serial]
async fn favorites_are_get_or_create_and_cascade() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 1000, 5).await;
    let user = UserId::new();

    let (first, created) = store.add_favorite(user, product.id).await.unwrap();
    assert!(created);
    let (again, created) = store.add_favorite(user, product.id).await.unwrap();
    assert!(!created);
    assert_eq!(again, first);

    assert!(store.delete_product(product.id).await.unwrap());
    assert!(store.favorites(user).await.unwrap().is_empty());
    assert!(!store.remove_favorite(user, product.id).await.unwrap());
}
