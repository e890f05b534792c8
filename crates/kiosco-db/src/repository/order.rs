//! # Order Engine
//!
//! Persists orders and drives them through their lifecycle. The legality of
//! each step is decided by `kiosco_core::order`; this module applies it to
//! the database inside one write transaction per step.
//!
//! ## Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_order   branch → Draft          admin → Approved                │
//! │       │                                                                 │
//! │  submit_order   Draft → PendingReview                                   │
//! │       │                                                                 │
//! │  approve_order  PendingReview → Approved      (admin)                   │
//! │       │         sourced? debit (product, origin) for every item         │
//! │       │                                                                 │
//! │  reject_order   PendingReview → Rejected      (admin, no stock effect)  │
//! │       │                                                                 │
//! │  receive_order  Approved → Received                                     │
//! │                 credit (product, destination) for every item            │
//! │                                                                         │
//! │  Any error inside a step drops the transaction: no stock moves, the     │
//! │  order keeps its previous status.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::catalog::fetch_product;
use crate::repository::location::{fetch_location, fetch_sub_location_with_kind};
use crate::repository::stock;
use kiosco_core::order::{
    authorize, plan_receipt, plan_sourcing, transition, ApprovalRequest, ItemDestination, NewOrder, OrderFilter,
};
use kiosco_core::validation::{validate_document_ref, validate_new_order};
use kiosco_core::{Actor, CoreError, LocationKind, Order, OrderAction, OrderItem, OrderStatus};

const ORDER_COLUMNS: &str =
    "id, requested_by, destination_id, status, sourced_from_warehouse, document_ref, created_at, updated_at";

/// Repository and lifecycle engine for orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    db: Database,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(db: Database) -> Self {
        OrderRepository { db }
    }

    /// Creates an order with a cost snapshot per item.
    ///
    /// Branch staff may only order for their own location and start in
    /// `Draft`. Admin orders start `Approved` and are never warehouse-sourced.
    pub async fn create_order(&self, actor: &Actor, input: NewOrder) -> DbResult<Order> {
        validate_new_order(&input)?;
        actor.require_location(&input.destination_id, "create orders")?;

        let mut tx = self.db.begin_write().await?;

        if fetch_location(&mut *tx, &input.destination_id).await?.is_none() {
            return Err(DbError::not_found("Location", &input.destination_id));
        }

        let order_id = Uuid::new_v4().to_string();
        let mut items = Vec::with_capacity(input.items.len());
        for (position, line) in input.items.iter().enumerate() {
            let product = fetch_product(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", &line.product_id))?;
            items.push(OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                position: position as i64,
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                unit_cost_cents: product.cost_cents,
                origin_sub_location_id: None,
                destination_sub_location_id: None,
            });
        }

        let order = Order {
            id: order_id,
            requested_by: actor.user_id.clone(),
            destination_id: input.destination_id,
            status: OrderStatus::initial_for(&actor.role),
            sourced_from_warehouse: false,
            document_ref: input.document_ref,
            created_at: input.created_at,
            updated_at: input.created_at,
            items,
        };

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ))
        .bind(&order.id)
        .bind(&order.requested_by)
        .bind(&order.destination_id)
        .bind(order.status)
        .bind(order.sourced_from_warehouse)
        .bind(&order.document_ref)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, quantity, unit_cost_cents)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(item.position)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_cost_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            destination_id = %order.destination_id,
            status = %order.status,
            items = order.items.len(),
            "Order created"
        );
        Ok(order)
    }

    /// Draft → PendingReview.
    pub async fn submit_order(&self, actor: &Actor, order_id: &str) -> DbResult<Order> {
        self.simple_transition(actor, order_id, OrderAction::Submit).await
    }

    /// PendingReview → Rejected. No stock effect.
    pub async fn reject_order(&self, actor: &Actor, order_id: &str) -> DbResult<Order> {
        self.simple_transition(actor, order_id, OrderAction::Reject).await
    }

    async fn simple_transition(&self, actor: &Actor, order_id: &str, action: OrderAction) -> DbResult<Order> {
        let mut tx = self.db.begin_write().await?;
        let mut order = load_for_action(&mut *tx, actor, order_id, action).await?;

        let next = transition(&order.id, order.status, action)?;
        set_status(&mut *tx, &mut order, next).await?;

        tx.commit().await?;
        info!(order_id, %action, status = %order.status, "Order transitioned");
        Ok(order)
    }

    /// PendingReview → Approved, optionally sourcing every item from
    /// warehouse stock.
    ///
    /// ## Sourced Approval
    /// ```text
    /// for each item:
    ///     origin must be a sub-location of a warehouse
    ///     debit (product, origin) by quantity   ← InsufficientStock aborts all
    /// record origins, flag, status
    /// ```
    pub async fn approve_order(&self, actor: &Actor, order_id: &str, request: ApprovalRequest) -> DbResult<Order> {
        let mut tx = self.db.begin_write().await?;
        let mut order = load_for_action(&mut *tx, actor, order_id, OrderAction::Approve).await?;

        let next = transition(&order.id, order.status, OrderAction::Approve)?;
        let now = Utc::now();

        let moves = plan_sourcing(&order, &request)?;
        let mut origins = Vec::with_capacity(moves.len());
        for planned in &moves {
            let (sub, kind) = fetch_sub_location_with_kind(&mut *tx, &planned.sub_location_id).await?;
            if kind != LocationKind::Warehouse {
                return Err(CoreError::invalid_sub_location(
                    &sub.id,
                    format!("{} is not in a warehouse", sub.name),
                )
                .into());
            }
            stock::debit(
                &mut *tx,
                &planned.item.product_id,
                &planned.sub_location_id,
                planned.item.quantity,
                now,
            )
            .await?;
            origins.push((planned.item.id.clone(), planned.sub_location_id.clone()));
        }

        for (item_id, sub_location_id) in &origins {
            sqlx::query("UPDATE order_items SET origin_sub_location_id = ?2 WHERE id = ?1")
                .bind(item_id)
                .bind(sub_location_id)
                .execute(&mut *tx)
                .await?;
            if let Some(item) = order.items.iter_mut().find(|i| &i.id == item_id) {
                item.origin_sub_location_id = Some(sub_location_id.clone());
            }
        }

        sqlx::query("UPDATE orders SET sourced_from_warehouse = ?2 WHERE id = ?1")
            .bind(&order.id)
            .bind(request.sourced_from_warehouse)
            .execute(&mut *tx)
            .await?;
        order.sourced_from_warehouse = request.sourced_from_warehouse;

        set_status(&mut *tx, &mut order, next).await?;
        tx.commit().await?;

        info!(
            order_id,
            sourced = order.sourced_from_warehouse,
            debits = origins.len(),
            "Order approved"
        );
        Ok(order)
    }

    /// Approved → Received, crediting every item into its destination.
    ///
    /// Destinations given here override any stored one; items without either
    /// fail with `MissingDestination`.
    pub async fn receive_order(
        &self,
        actor: &Actor,
        order_id: &str,
        destinations: Vec<ItemDestination>,
    ) -> DbResult<Order> {
        let mut tx = self.db.begin_write().await?;
        let mut order = load_for_action(&mut *tx, actor, order_id, OrderAction::Receive).await?;

        let next = transition(&order.id, order.status, OrderAction::Receive)?;
        let now = Utc::now();

        let moves = plan_receipt(&order, &destinations)?;
        let mut credited = Vec::with_capacity(moves.len());
        for planned in &moves {
            let (sub, _) = fetch_sub_location_with_kind(&mut *tx, &planned.sub_location_id).await?;
            if sub.location_id != order.destination_id {
                return Err(CoreError::invalid_sub_location(
                    &sub.id,
                    format!("{} does not belong to the order's location", sub.name),
                )
                .into());
            }
            stock::credit(
                &mut *tx,
                &planned.item.product_id,
                &planned.sub_location_id,
                planned.item.quantity,
                now,
            )
            .await?;
            credited.push((planned.item.id.clone(), planned.sub_location_id.clone()));
        }

        for (item_id, sub_location_id) in &credited {
            sqlx::query("UPDATE order_items SET destination_sub_location_id = ?2 WHERE id = ?1")
                .bind(item_id)
                .bind(sub_location_id)
                .execute(&mut *tx)
                .await?;
            if let Some(item) = order.items.iter_mut().find(|i| &i.id == item_id) {
                item.destination_sub_location_id = Some(sub_location_id.clone());
            }
        }

        set_status(&mut *tx, &mut order, next).await?;
        tx.commit().await?;

        info!(order_id, credits = credited.len(), "Order received");
        Ok(order)
    }

    /// Stores an opaque document reference (shipment note, invoice) on the
    /// order. Allowed in any status.
    pub async fn attach_document(&self, actor: &Actor, order_id: &str, reference: &str) -> DbResult<Order> {
        validate_document_ref(reference)?;

        let mut tx = self.db.begin_write().await?;
        let mut order = fetch_order(&mut *tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;
        actor.require_location(&order.destination_id, "attach documents")?;

        order.document_ref = Some(reference.to_string());
        order.updated_at = Utc::now();
        sqlx::query("UPDATE orders SET document_ref = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&order.id)
            .bind(&order.document_ref)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(order_id, "Document attached");
        Ok(order)
    }

    /// Gets an order with its items.
    pub async fn get_order(&self, order_id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_order(&mut *conn, order_id).await
    }

    /// Lists orders newest first, with items.
    pub async fn list_orders(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        let mut conn = self.db.pool().acquire().await?;

        let mut orders: Vec<Order> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE (?1 IS NULL OR destination_id = ?1) \
               AND (?2 IS NULL OR status = ?2) \
             ORDER BY created_at DESC, id"
        ))
        .bind(filter.destination_id.as_deref())
        .bind(filter.status)
        .fetch_all(&mut *conn)
        .await?;

        for order in &mut orders {
            order.items = fetch_items(&mut *conn, &order.id).await?;
        }

        Ok(orders)
    }
}

// =============================================================================
// Helpers (on the transaction connection)
// =============================================================================

/// Loads the order and checks the actor may perform `action` on it.
async fn load_for_action(
    conn: &mut SqliteConnection,
    actor: &Actor,
    order_id: &str,
    action: OrderAction,
) -> DbResult<Order> {
    let order = fetch_order(conn, order_id)
        .await?
        .ok_or_else(|| DbError::not_found("Order", order_id))?;
    authorize(actor, action, &order.destination_id)?;
    Ok(order)
}

async fn set_status(conn: &mut SqliteConnection, order: &mut Order, status: OrderStatus) -> DbResult<()> {
    let now = Utc::now();
    sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&order.id)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    debug!(order_id = %order.id, from = %order.status, to = %status, "Order status changed");
    order.status = status;
    order.updated_at = now;
    Ok(())
}

pub(crate) async fn fetch_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<Order>> {
    let order: Option<Order> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;

    match order {
        Some(mut order) => {
            order.items = fetch_items(conn, order_id).await?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

async fn fetch_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as(
        r#"
        SELECT
            oi.id,
            oi.order_id,
            oi.position,
            oi.product_id,
            p.name AS product_name,
            oi.quantity,
            oi.unit_cost_cents,
            oi.origin_sub_location_id,
            oi.destination_sub_location_id
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ?1
        ORDER BY oi.position
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================
