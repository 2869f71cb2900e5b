//! Order service: placement, lifecycle transitions and queries.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{
    Money, Order, OrderId, OrderItem, OrderStatus, Product, ProductId, ShippingAddress, UserId,
};
use store::{OrderQuery, Store, StoreExt, UnitOfWork};
use uuid::Uuid;

use crate::error::{DomainError, Result};

use super::lifecycle::{self, Actor, OrderAction};
use super::PlaceOrder;

/// Service for placing orders and moving them through their lifecycle.
///
/// Every mutating operation runs inside one unit of work: either all of
/// its effects become visible or none do.
#[derive(Debug, Clone)]
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order.
    ///
    /// Locks every requested product, checks and decrements its stock,
    /// persists the order with price and name snapshots, and removes the
    /// purchased products from the user's cart, all in one unit of work.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn create_order(&self, cmd: PlaceOrder) -> Result<Order> {
        let started = Instant::now();
        let result = self.place(&cmd).await;
        metrics::histogram!("order_creation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    order_no = %order.order_no,
                    total = %order.total_amount,
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("order_creation_failed_total", "reason" => e.code())
                    .increment(1);
                match e {
                    DomainError::Store(_) => tracing::error!(error = %e, "order placement failed"),
                    _ => tracing::info!(error = %e, "order rejected"),
                }
            }
        }

        result
    }

    async fn place(&self, cmd: &PlaceOrder) -> Result<Order> {
        let lines = cmd.merged_lines()?;
        let mut uow = self.store.begin().await?;

        let address = uow
            .address(cmd.address_id, cmd.user_id)
            .await?
            .ok_or(DomainError::AddressNotFound)?;

        // Lock in ascending id order so concurrent placements cannot deadlock.
        let mut wanted: Vec<(ProductId, u32)> =
            lines.iter().map(|l| (l.product_id, l.quantity)).collect();
        wanted.sort_by_key(|(id, _)| *id);

        let mut products: HashMap<ProductId, Product> = HashMap::with_capacity(wanted.len());
        for &(id, quantity) in &wanted {
            let product = uow
                .product_for_update(id)
                .await?
                .filter(|p| p.is_active)
                .ok_or(DomainError::ProductNotFound(id))?;

            if !product.has_stock_for(quantity) {
                return Err(DomainError::InsufficientStock {
                    product_id: id,
                    product_name: product.name,
                    requested: quantity,
                    available: product.stock,
                });
            }
            products.insert(id, product);
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = products
                .get(&line.product_id)
                .ok_or(DomainError::ProductNotFound(line.product_id))?;
            items.push(OrderItem {
                product_id: Some(product.id),
                product_name: product.name.clone(),
                unit_price: product.price,
                quantity: line.quantity,
            });
        }

        let total_amount = Order::checked_total(&items)
            .filter(Money::is_storable)
            .ok_or_else(|| DomainError::Validation("order total is out of range".to_string()))?;

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            order_no: generate_order_no(now),
            user_id: cmd.user_id,
            status: OrderStatus::Pending,
            total_amount,
            shipping: ShippingAddress::from(&address),
            tracking_no: None,
            items,
            created_at: now,
            paid_at: None,
            shipped_at: None,
            completed_at: None,
        };
        uow.insert_order(&order).await?;

        for &(id, quantity) in &wanted {
            uow.adjust_stock(id, -i64::from(quantity))
                .await?
                .ok_or(DomainError::ProductNotFound(id))?;
        }

        let purchased: Vec<ProductId> = wanted.iter().map(|(id, _)| *id).collect();
        let pruned = uow.remove_cart_items(cmd.user_id, &purchased).await?;
        tracing::debug!(pruned, "cart rows removed");

        uow.commit().await?;
        Ok(order)
    }

    /// Applies a lifecycle action to an order.
    ///
    /// The order row stays locked from the status check until commit, so
    /// two overlapping transitions on one order run one after the other and
    /// a cancellation restores stock at most once.
    #[tracing::instrument(skip(self, action), fields(action = action.name()))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        action: OrderAction,
        actor: Actor,
    ) -> Result<Order> {
        let mut uow = self.store.begin().await?;

        let mut order = uow
            .order_for_update(order_id)
            .await?
            .filter(|o| actor.can_see(o))
            .ok_or(DomainError::OrderNotFound)?;
        let from = order.status;

        let transition = lifecycle::apply(&mut order, &action, actor.role(), Utc::now())?;
        uow.save_order_status(&order).await?;

        if transition.to == OrderStatus::Cancelled {
            restore_stock(uow.as_mut(), &order).await?;
        }

        uow.commit().await?;

        metrics::counter!(
            "order_transitions_total",
            "action" => action.name(),
            "to" => order.status.as_str()
        )
        .increment(1);
        tracing::info!(
            order_no = %order.order_no,
            from = %from,
            to = %order.status,
            actor = %actor.role(),
            "order transitioned"
        );

        Ok(order)
    }

    /// Records payment for one of the user's orders.
    pub async fn pay(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        self.transition(order_id, OrderAction::Pay, Actor::Owner(user_id))
            .await
    }

    /// Marks an order shipped, with an optional tracking number.
    pub async fn ship(&self, order_id: OrderId, tracking_no: Option<String>) -> Result<Order> {
        let action = OrderAction::Ship { tracking_no };
        self.transition(order_id, action, Actor::Admin).await
    }

    /// Confirms receipt of one of the user's orders.
    pub async fn confirm(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        self.transition(order_id, OrderAction::Confirm, Actor::Owner(user_id))
            .await
    }

    /// Cancels an order and restores its stock.
    ///
    /// Owners may cancel a pending or paid order; administrators any order
    /// that is not yet completed or cancelled.
    pub async fn cancel(&self, order_id: OrderId, actor: Actor) -> Result<Order> {
        self.transition(order_id, OrderAction::Cancel, actor).await
    }

    /// Lists a user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        Ok(self.store.orders_of(user_id, status).await?)
    }

    /// Lists every order, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let query = OrderQuery {
            status,
            ..OrderQuery::new()
        };
        Ok(self.store.list_orders(query).await?)
    }

    /// Loads an order visible to `actor`.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId, actor: Actor) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .filter(|o| actor.can_see(o))
            .ok_or(DomainError::OrderNotFound)
    }
}

/// Returns every unit of a cancelled order to stock.
///
/// Products are locked in ascending id order. Items whose product has since
/// been deleted have nowhere to go and are skipped with a warning.
async fn restore_stock(uow: &mut dyn UnitOfWork, order: &Order) -> Result<u64> {
    let mut quantities: BTreeMap<ProductId, u64> = BTreeMap::new();
    for item in &order.items {
        match item.product_id {
            Some(id) => *quantities.entry(id).or_default() += u64::from(item.quantity),
            None => tracing::warn!(
                order_no = %order.order_no,
                product_name = %item.product_name,
                quantity = item.quantity,
                "product was deleted, skipping stock restitution"
            ),
        }
    }

    let mut restored = 0;
    for (id, quantity) in quantities {
        let delta = i64::try_from(quantity)
            .map_err(|_| DomainError::Validation(format!("quantity {quantity} too large")))?;
        match uow.adjust_stock(id, delta).await? {
            Some(_) => restored += quantity,
            None => tracing::warn!(
                order_no = %order.order_no,
                product_id = %id,
                quantity,
                "product no longer exists, skipping stock restitution"
            ),
        }
    }

    metrics::counter!("stock_restituted_units_total").increment(restored);
    Ok(restored)
}

/// Generates a customer-facing order number: the UTC creation time as
/// `YYYYMMDDHHMMSS` followed by six random digits.
fn generate_order_no(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().as_u128() % 1_000_000;
    format!("{}{suffix:06}", now.format("%Y%m%d%H%M%S"))
}
