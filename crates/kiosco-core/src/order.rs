//! # Order Lifecycle
//!
//! Pure state machine for purchase orders placed by branches.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   (branch creates)                          (admin creates)             │
//! │         │                                         │                     │
//! │         ▼                                         │                     │
//! │     ┌───────┐  submit  ┌────────────────┐         │                     │
//! │     │ Draft │─────────►│ PendingReview  │         │                     │
//! │     └───────┘          └───┬────────┬───┘         │                     │
//! │                     approve│        │reject       │                     │
//! │                            ▼        ▼             │                     │
//! │                     ┌──────────┐ ┌──────────┐     │                     │
//! │                     │ Approved │ │ Rejected │■    │                     │
//! │                     └────┬─────┘ └──────────┘     │                     │
//! │                          │◄──────────────────────-┘                     │
//! │                   receive│                                              │
//! │                          ▼                                              │
//! │                     ┌──────────┐                                        │
//! │                     │ Received │■          ■ = terminal                 │
//! │                     └──────────┘                                        │
//! │                                                                         │
//! │  Stock effects (applied by the storage layer):                          │
//! │  • approve (warehouse-sourced) → debit warehouse origin rows            │
//! │  • receive                     → credit branch destination rows         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module decides *whether* a transition is legal and *which* rows it
//! touches. It never touches storage itself.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::identity::{Actor, Role};
use crate::money::Money;

// =============================================================================
// Status & Actions
// =============================================================================

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    PendingReview,
    Approved,
    Rejected,
    Received,
}

impl OrderStatus {
    /// Status a new order starts in, depending on who creates it.
    pub fn initial_for(role: &Role) -> OrderStatus {
        match role {
            Role::Admin => OrderStatus::Approved,
            Role::Branch { .. } => OrderStatus::Draft,
        }
    }

    /// Terminal states accept no further action.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Received)
    }

    /// Returns the state `action` leads to, or `None` if it is not allowed
    /// from `self`.
    pub fn next(self, action: OrderAction) -> Option<OrderStatus> {
        match (self, action) {
            (OrderStatus::Draft, OrderAction::Submit) => Some(OrderStatus::PendingReview),
            (OrderStatus::PendingReview, OrderAction::Approve) => Some(OrderStatus::Approved),
            (OrderStatus::PendingReview, OrderAction::Reject) => Some(OrderStatus::Rejected),
            (OrderStatus::Approved, OrderAction::Receive) => Some(OrderStatus::Received),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::PendingReview => "pending_review",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Received => "received",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action that moves an order through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Submit,
    Approve,
    Reject,
    Receive,
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderAction::Submit => "submit",
            OrderAction::Approve => "approve",
            OrderAction::Reject => "reject",
            OrderAction::Receive => "receive",
        };
        f.write_str(s)
    }
}

/// Checks a transition and returns the target state.
///
/// ```rust
/// use kiosco_core::order::{transition, OrderAction, OrderStatus};
///
/// assert_eq!(
///     transition("o-1", OrderStatus::Draft, OrderAction::Submit).unwrap(),
///     OrderStatus::PendingReview
/// );
/// assert!(transition("o-1", OrderStatus::Draft, OrderAction::Reject).is_err());
/// ```
pub fn transition(order_id: &str, from: OrderStatus, action: OrderAction) -> CoreResult<OrderStatus> {
    from.next(action).ok_or_else(|| CoreError::InvalidTransition {
        order_id: order_id.to_string(),
        from,
        action,
    })
}

// =============================================================================
// Order & Items
// =============================================================================

/// A branch's request for goods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// User that created the order.
    pub requested_by: String,
    /// Location the goods are for.
    pub destination_id: String,
    pub status: OrderStatus,
    /// Whether approval debited warehouse stock for the items.
    pub sourced_from_warehouse: bool,
    /// Opaque reference to an attached document (shipment note, invoice...).
    pub document_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Σ(quantity × cost snapshot) over the items.
    pub fn total_cost(&self) -> Money {
        self.items.iter().map(OrderItem::line_cost).sum()
    }

    fn item(&self, item_id: &str) -> CoreResult<&OrderItem> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::UnknownItem {
                order_id: self.id.clone(),
                item_id: item_id.to_string(),
            })
    }
}

/// A line of an order. Quantity and cost are frozen at creation; only the
/// origin / destination sub-locations are filled in later, by approval and
/// receipt respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub position: i64,
    pub product_id: String,
    /// Product name, joined for display and error messages.
    pub product_name: String,
    pub quantity: i64,
    /// Purchase cost in cents at the time of ordering (frozen).
    pub unit_cost_cents: i64,
    pub origin_sub_location_id: Option<String>,
    pub destination_sub_location_id: Option<String>,
}

impl OrderItem {
    #[inline]
    pub fn line_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.quantity)
    }
}

/// A requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: i64,
}

/// Input for creating an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    pub destination_id: String,
    pub items: Vec<NewOrderItem>,
    pub document_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Filters for listing orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderFilter {
    pub destination_id: Option<String>,
    pub status: Option<OrderStatus>,
}

// =============================================================================
// Approval & Receipt Payloads
// =============================================================================

/// Where an item is taken from when the warehouse sources it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemOrigin {
    pub item_id: String,
    pub sub_location_id: String,
}

/// Admin decision to approve a pending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApprovalRequest {
    pub sourced_from_warehouse: bool,
    /// Required for every item when `sourced_from_warehouse` is set.
    #[serde(default)]
    pub origins: Vec<ItemOrigin>,
}

/// Where an item is shelved when the branch receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemDestination {
    pub item_id: String,
    pub sub_location_id: String,
}

/// One stock movement derived from an approval or receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove<'a> {
    pub item: &'a OrderItem,
    pub sub_location_id: String,
}

/// Validates an approval against the order and returns the warehouse debits
/// it implies, in item order. Empty when not warehouse-sourced.
///
/// The caller must already have checked the transition.
pub fn plan_sourcing<'a>(order: &'a Order, request: &ApprovalRequest) -> CoreResult<Vec<PlannedMove<'a>>> {
    let by_item = index_assignments(
        order,
        request.origins.iter().map(|o| (o.item_id.as_str(), o.sub_location_id.as_str())),
    )?;

    if !request.sourced_from_warehouse {
        return Ok(Vec::new());
    }

    order
        .items
        .iter()
        .map(|item| match by_item.get(item.id.as_str()) {
            Some(sub_location_id) => Ok(PlannedMove {
                item,
                sub_location_id: sub_location_id.to_string(),
            }),
            None => Err(CoreError::MissingOrigin {
                order_id: order.id.clone(),
                item_id: item.id.clone(),
                product_name: item.product_name.clone(),
            }),
        })
        .collect()
}

/// Validates a receipt against the order and returns the credits it implies,
/// in item order.
pub fn plan_receipt<'a>(order: &'a Order, destinations: &[ItemDestination]) -> CoreResult<Vec<PlannedMove<'a>>> {
    let by_item = index_assignments(
        order,
        destinations.iter().map(|d| (d.item_id.as_str(), d.sub_location_id.as_str())),
    )?;

    order
        .items
        .iter()
        .map(|item| {
            let assigned = by_item
                .get(item.id.as_str())
                .copied()
                .or(item.destination_sub_location_id.as_deref());
            match assigned {
                Some(sub_location_id) => Ok(PlannedMove {
                    item,
                    sub_location_id: sub_location_id.to_string(),
                }),
                None => Err(CoreError::MissingDestination {
                    order_id: order.id.clone(),
                    item_id: item.id.clone(),
                    product_name: item.product_name.clone(),
                }),
            }
        })
        .collect()
}

/// Maps item id → sub-location id, rejecting unknown and repeated items.
fn index_assignments<'a>(
    order: &Order,
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
) -> CoreResult<HashMap<&'a str, &'a str>> {
    let mut seen = HashSet::new();
    let mut map = HashMap::new();
    for (item_id, sub_location_id) in pairs {
        order.item(item_id)?;
        if !seen.insert(item_id) {
            return Err(ValidationError::Duplicate {
                field: "item_id".to_string(),
                value: item_id.to_string(),
            }
            .into());
        }
        if sub_location_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "sub_location_id".to_string(),
            }
            .into());
        }
        map.insert(item_id, sub_location_id);
    }
    Ok(map)
}

/// Whether `actor` may perform `action` on an order for `destination_id`.
///
/// Approve and reject are admin-only. Everything else is open to admins and
/// to staff of the destination branch.
pub fn authorize(actor: &Actor, action: OrderAction, destination_id: &str) -> CoreResult<()> {
    match action {
        OrderAction::Approve => actor.require_admin("approve orders"),
        OrderAction::Reject => actor.require_admin("reject orders"),
        OrderAction::Submit => actor.require_location(destination_id, "submit orders"),
        OrderAction::Receive => actor.require_location(destination_id, "receive orders"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
