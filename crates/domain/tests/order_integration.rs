//! Integration tests for order placement and the order lifecycle.
//!
//! These tests exercise the services against the in-memory store,
//! including concurrent placements racing for the same stock.

use std::sync::Arc;

use common::{Address, AddressId, Money, OrderStatus, Product, ProductId, UserId};
use domain::{
    Actor, CartService, CatalogService, DomainError, NewProduct, OrderAction, OrderService,
    PlaceOrder, ProductPatch,
};
use store::{InMemoryStore, Store};

struct Shop {
    store: InMemoryStore,
    orders: OrderService<InMemoryStore>,
}

impl Shop {
    fn new() -> Self {
        let store = InMemoryStore::new();
        Self {
            orders: OrderService::new(store.clone()),
            store,
        }
    }

    async fn product(&self, name: &str, cents: i64, stock: u32) -> Product {
        let product = Product::new(name, Money::from_cents(cents), stock);
        self.store.save_product(&product).await.unwrap();
        product
    }

    async fn customer(&self) -> (UserId, AddressId) {
        let user = UserId::new();
        let address = Address {
            id: AddressId::new(),
            user_id: user,
            recipient_name: "Ada Lovelace".to_string(),
            phone: "555-0100".to_string(),
            province: "North".to_string(),
            city: "Springfield".to_string(),
            district: "Central".to_string(),
            street: "1 Main St".to_string(),
        };
        self.store.save_address(&address).await.unwrap();
        (user, address.id)
    }

    async fn stock(&self, id: ProductId) -> u32 {
        self.store.get_product(id).await.unwrap().unwrap().stock
    }
}

mod placement {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_never_oversell() {
        const STOCK: u32 = 7;
        const BUYERS: usize = 25;

        let shop = Arc::new(Shop::new());
        let widget = shop.product("Widget", 1000, STOCK).await;

        let mut handles = Vec::with_capacity(BUYERS);
        for _ in 0..BUYERS {
            let shop = Arc::clone(&shop);
            handles.push(tokio::spawn(async move {
                let (user, address) = shop.customer().await;
                shop.orders
                    .create_order(PlaceOrder::new(user, address, Vec::new()).with_item(widget.id, 1))
                    .await
            }));
        }

        let mut placed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(DomainError::InsufficientStock { .. }) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(placed, STOCK as usize);
        assert_eq!(rejected, BUYERS - STOCK as usize);
        assert_eq!(shop.stock(widget.id).await, 0);
        assert_eq!(shop.store.order_count().await, STOCK as usize);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_multi_product_orders_do_not_deadlock() {
        let shop = Arc::new(Shop::new());
        let a = shop.product("Alpha", 100, 50).await;
        let b = shop.product("Beta", 100, 50).await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let shop = Arc::clone(&shop);
            let (first, second) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
            handles.push(tokio::spawn(async move {
                let (user, address) = shop.customer().await;
                shop.orders
                    .create_order(
                        PlaceOrder::new(user, address, Vec::new())
                            .with_item(first, 1)
                            .with_item(second, 1),
                    )
                    .await
            }));
        }

        let all = async {
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(10), all)
            .await
            .expect("placements deadlocked");

        assert_eq!(shop.stock(a.id).await, 30);
        assert_eq!(shop.stock(b.id).await, 30);
    }

    #[tokio::test]
    async fn widget_scenario() {
        let shop = Shop::new();
        let widget = shop.product("Widget", 1999, 5).await;
        let (user, address) = shop.customer().await;

        let order = shop
            .orders
            .create_order(PlaceOrder::new(user, address, Vec::new()).with_item(widget.id, 5))
            .await
            .unwrap();
        assert_eq!(shop.stock(widget.id).await, 0);

        let err = shop
            .orders
            .create_order(PlaceOrder::new(user, address, Vec::new()).with_item(widget.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 1,
                available: 0,
                ..
            }
        ));

        shop.orders
            .cancel(order.id, Actor::Owner(user))
            .await
            .unwrap();
        assert_eq!(shop.stock(widget.id).await, 5);
    }

    #[tokio::test]
    async fn price_snapshot_survives_price_change() {
        let shop = Shop::new();
        let catalog = CatalogService::new(shop.store.clone());
        let widget = shop.product("Widget", 1000, 10).await;
        let (user, address) = shop.customer().await;

        let order = shop
            .orders
            .create_order(PlaceOrder::new(user, address, Vec::new()).with_item(widget.id, 3))
            .await
            .unwrap();

        catalog
            .update_product(
                widget.id,
                ProductPatch {
                    name: Some("Widget Deluxe".to_string()),
                    price: Some(Money::from_cents(5000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = shop.orders.get_order(order.id, Actor::Owner(user)).await.unwrap();
        assert_eq!(stored.items[0].unit_price, Money::from_cents(1000));
        assert_eq!(stored.items[0].product_name, "Widget");
        assert_eq!(stored.total_amount, Money::from_cents(3000));
        assert_eq!(Some(stored.total_amount), stored.items_total());
    }

    #[tokio::test]
    async fn placement_prunes_purchased_products_from_cart() {
        let shop = Shop::new();
        let cart = CartService::new(shop.store.clone());
        let a = shop.product("Alpha", 100, 10).await;
        let b = shop.product("Beta", 200, 10).await;
        let c = shop.product("Gamma", 300, 10).await;
        let (user, address) = shop.customer().await;

        cart.add_item(user, a.id, 4).await.unwrap();
        cart.add_item(user, b.id, 1).await.unwrap();
        cart.add_item(user, c.id, 2).await.unwrap();

        // Quantities need not match the cart rows.
        shop.orders
            .create_order(
                PlaceOrder::new(user, address, Vec::new())
                    .with_item(a.id, 1)
                    .with_item(b.id, 1),
            )
            .await
            .unwrap();

        let view = cart.cart(user).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product_id, c.id);
        assert_eq!(view.total_price, Money::from_cents(600));
    }

    #[tokio::test]
    async fn someone_elses_address_is_not_found() {
        let shop = Shop::new();
        let widget = shop.product("Widget", 1000, 10).await;
        let (user, _) = shop.customer().await;
        let (_, other_address) = shop.customer().await;

        let err = shop
            .orders
            .create_order(
                PlaceOrder::new(user, other_address, Vec::new()).with_item(widget.id, 1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AddressNotFound));
        assert_eq!(shop.stock(widget.id).await, 10);
    }
}

mod lifecycle {
    use super::*;

    async fn placed(shop: &Shop, quantity: u32) -> (UserId, common::Order, Product) {
        let widget = shop.product("Widget", 1000, 10).await;
        let (user, address) = shop.customer().await;
        let order = shop
            .orders
            .create_order(
                PlaceOrder::new(user, address, Vec::new()).with_item(widget.id, quantity),
            )
            .await
            .unwrap();
        (user, order, widget)
    }

    #[tokio::test]
    async fn owner_cannot_cancel_shipped_order() {
        let shop = Shop::new();
        let (user, order, widget) = placed(&shop, 2).await;
        shop.orders.pay(order.id, user).await.unwrap();
        let shipped = shop.orders.ship(order.id, Some("TRACK-1".to_string())).await.unwrap();

        let err = shop
            .orders
            .cancel(order.id, Actor::Owner(user))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidStateTransition {
                current_state: OrderStatus::Shipped,
                ..
            }
        ));

        let stored = shop.orders.get_order(order.id, Actor::Admin).await.unwrap();
        assert_eq!(stored, shipped);
        assert_eq!(shop.stock(widget.id).await, 8);
    }

    #[tokio::test]
    async fn admin_cancel_of_shipped_order_restores_stock() {
        let shop = Shop::new();
        let (user, order, widget) = placed(&shop, 2).await;
        shop.orders.pay(order.id, user).await.unwrap();
        shop.orders.ship(order.id, Some("TRACK-1".to_string())).await.unwrap();

        let cancelled = shop.orders.cancel(order.id, Actor::Admin).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(shop.stock(widget.id).await, 10);
    }

    #[tokio::test]
    async fn rejected_transitions_leave_order_untouched() {
        let shop = Shop::new();
        let (user, order, _) = placed(&shop, 1).await;

        let attempts = [
            (OrderAction::Confirm, Actor::Owner(user)),
            (
                OrderAction::Ship {
                    tracking_no: Some("T".to_string()),
                },
                Actor::Admin,
            ),
            (
                OrderAction::Ship {
                    tracking_no: Some("T".to_string()),
                },
                Actor::Owner(user),
            ),
            (OrderAction::Pay, Actor::Admin),
        ];

        for (action, actor) in attempts {
            let err = shop
                .orders
                .transition(order.id, action, actor)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                DomainError::InvalidStateTransition { .. } | DomainError::NotPermitted { .. }
            ));
        }

        let stored = shop.orders.get_order(order.id, Actor::Admin).await.unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn completed_order_cannot_be_cancelled() {
        let shop = Shop::new();
        let (user, order, widget) = placed(&shop, 3).await;
        shop.orders.pay(order.id, user).await.unwrap();
        shop.orders.ship(order.id, Some("TRACK-1".to_string())).await.unwrap();
        shop.orders.confirm(order.id, user).await.unwrap();

        for actor in [Actor::Owner(user), Actor::Admin] {
            assert!(matches!(
                shop.orders.cancel(order.id, actor).await,
                Err(DomainError::InvalidStateTransition { .. })
            ));
        }
        assert_eq!(shop.stock(widget.id).await, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_cancels_restore_stock_once() {
        let shop = Arc::new(Shop::new());
        let (user, order, widget) = placed(&shop, 4).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let shop = Arc::clone(&shop);
            let actor = if i % 2 == 0 { Actor::Owner(user) } else { Actor::Admin };
            handles.push(tokio::spawn(async move {
                shop.orders.cancel(order.id, actor).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(DomainError::InvalidStateTransition { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(shop.stock(widget.id).await, 10);
    }

    #[tokio::test]
    async fn cancel_skips_deleted_products() {
        let shop = Shop::new();
        let catalog = CatalogService::new(shop.store.clone());
        let kept = shop.product("Kept", 100, 10).await;
        let doomed = catalog
            .create_product(NewProduct {
                name: "Doomed".to_string(),
                price: Money::from_cents(100),
                stock: 10,
                category_id: None,
            })
            .await
            .unwrap();
        let (user, address) = shop.customer().await;

        let order = shop
            .orders
            .create_order(
                PlaceOrder::new(user, address, Vec::new())
                    .with_item(kept.id, 2)
                    .with_item(doomed.id, 3),
            )
            .await
            .unwrap();

        catalog.delete_product(doomed.id).await.unwrap();

        let cancelled = shop.orders.cancel(order.id, Actor::Owner(user)).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.items[1].product_id, None);
        assert_eq!(cancelled.items[1].product_name, "Doomed");
        assert_eq!(shop.stock(kept.id).await, 10);
    }
}
