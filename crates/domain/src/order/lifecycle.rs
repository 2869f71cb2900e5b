//! Order lifecycle state machine.
//!
//! Every legal status change is a row of [`TRANSITIONS`]. Nothing outside
//! this module changes an order's status or lifecycle timestamps.

use chrono::{DateTime, Utc};
use common::{Order, OrderStatus, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// The kind of caller acting on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who is acting on an order.
///
/// Owners only ever see their own orders; administrators see every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Owner(UserId),
    Admin,
}

impl Actor {
    /// Returns the actor's role.
    pub fn role(&self) -> Role {
        match self {
            Actor::Owner(_) => Role::Owner,
            Actor::Admin => Role::Admin,
        }
    }

    /// Returns true if the actor may see the order at all.
    pub fn can_see(&self, order: &Order) -> bool {
        match self {
            Actor::Owner(user_id) => order.user_id == *user_id,
            Actor::Admin => true,
        }
    }
}

/// A requested lifecycle action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderAction {
    /// Record payment.
    Pay,
    /// Hand the order to the carrier, optionally with a tracking number.
    Ship { tracking_no: Option<String> },
    /// Confirm receipt.
    Confirm,
    /// Cancel and restore stock.
    Cancel,
}

impl OrderAction {
    /// Returns the action name used in errors, logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            OrderAction::Pay => "pay",
            OrderAction::Ship { .. } => "ship",
            OrderAction::Confirm => "confirm",
            OrderAction::Cancel => "cancel",
        }
    }
}

/// One legal edge of the lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub action: &'static str,
    pub role: Role,
    pub from: &'static [OrderStatus],
    pub to: OrderStatus,
}

/// The transition table.
///
/// ```text
/// action   role   from                       to
/// pay      owner  pending                    paid
/// ship     admin  paid                       shipped
/// confirm  owner  shipped                    completed
/// cancel   owner  pending, paid              cancelled
/// cancel   admin  pending, paid, shipped     cancelled
/// ```
pub const TRANSITIONS: &[Transition] = &[
    Transition {
        action: "pay",
        role: Role::Owner,
        from: &[OrderStatus::Pending],
        to: OrderStatus::Paid,
    },
    Transition {
        action: "ship",
        role: Role::Admin,
        from: &[OrderStatus::Paid],
        to: OrderStatus::Shipped,
    },
    Transition {
        action: "confirm",
        role: Role::Owner,
        from: &[OrderStatus::Shipped],
        to: OrderStatus::Completed,
    },
    Transition {
        action: "cancel",
        role: Role::Owner,
        from: &[OrderStatus::Pending, OrderStatus::Paid],
        to: OrderStatus::Cancelled,
    },
    Transition {
        action: "cancel",
        role: Role::Admin,
        from: &[
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
        ],
        to: OrderStatus::Cancelled,
    },
];

/// Looks up the edge `role` may take from `current` with `action`.
///
/// Fails with [`DomainError::NotPermitted`] if the role has no row for the
/// action at all, and with [`DomainError::InvalidStateTransition`] if it
/// has one but not from the current status.
pub fn find_transition(
    current: OrderStatus,
    action: &OrderAction,
    role: Role,
) -> Result<&'static Transition> {
    let name = action.name();
    let mut rows = TRANSITIONS
        .iter()
        .filter(|t| t.action == name && t.role == role)
        .peekable();

    if rows.peek().is_none() {
        return Err(DomainError::NotPermitted {
            action: name,
            actor: role.as_str(),
        });
    }

    rows.find(|t| t.from.contains(&current))
        .ok_or(DomainError::InvalidStateTransition {
            current_state: current,
            action: name,
        })
}

/// Applies `action` to `order`.
///
/// Looks the edge up before mutating anything, so on error the order's
/// status, tracking number and timestamps are untouched. Returns the edge
/// that was taken.
pub fn apply(
    order: &mut Order,
    action: &OrderAction,
    role: Role,
    now: DateTime<Utc>,
) -> Result<&'static Transition> {
    let transition = find_transition(order.status, action, role)?;

    match action {
        OrderAction::Pay => order.paid_at = Some(now),
        OrderAction::Ship { tracking_no } => {
            // Blank tracking numbers are stored as absent.
            order.tracking_no = tracking_no
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            order.shipped_at = Some(now);
        }
        OrderAction::Confirm => order.completed_at = Some(now),
        OrderAction::Cancel => {}
    }

    order.status = transition.to;
    Ok(transition)
}
