//! Order records and the order status enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Money, OrderId, ProductId, UserId};

/// The status of an order in its lifecycle.
///
/// ```text
/// Pending ──► Paid ──► Shipped ──► Completed
///    │          │         │
///    └──────────┴─────────┴──► Cancelled
/// ```
///
/// Which actor may take which edge is decided by the domain layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, awaiting payment.
    #[default]
    Pending,

    /// Payment recorded, awaiting shipment.
    Paid,

    /// Handed to the carrier.
    Shipped,

    /// Receipt confirmed by the owner (terminal state).
    Completed,

    /// Cancelled, stock restored (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string is not a known order status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl std::fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown order status: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Shipping details copied from an [`Address`] when the order is placed.
///
/// The order never reads the address book again after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient_name: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub street: String,
}

impl From<&Address> for ShippingAddress {
    fn from(address: &Address) -> Self {
        Self {
            recipient_name: address.recipient_name.clone(),
            phone: address.phone.clone(),
            province: address.province.clone(),
            city: address.city.clone(),
            district: address.district.clone(),
            street: address.street.clone(),
        }
    }
}

/// A line of an order.
///
/// Name and unit price are historical facts captured at order time; they
/// are never resynced from the live product. `product_id` becomes `None`
/// once the product is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// Returns the line total (unit_price * quantity), or `None` on overflow.
    pub fn subtotal(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// An order header together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Customer-facing order number, unique across all orders.
    pub order_no: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    /// Sum of line subtotals, frozen at creation.
    pub total_amount: Money,
    pub shipping: ShippingAddress,
    pub tracking_no: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Sums the subtotals of `items`, or `None` on overflow.
    pub fn checked_total(items: &[OrderItem]) -> Option<Money> {
        items
            .iter()
            .try_fold(Money::zero(), |acc, item| acc.checked_add(item.subtotal()?))
    }

    /// Returns the sum of the item subtotals, or `None` on overflow.
    pub fn items_total(&self) -> Option<Money> {
        Self::checked_total(&self.items)
    }

    /// Returns the total quantity of all items, saturating at `u32::MAX`.
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
