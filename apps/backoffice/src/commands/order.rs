//! # Order Commands
//!
//! ```text
//! branch:  create_order ──► submit_order ─────────────────────► receive_order
//!                                 │                                   ▲
//! admin:                          └──► approve_order / reject_order ──┘
//! ```
//!
//! Orders created by an admin skip straight to approved.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use kiosco_core::order::{ApprovalRequest, ItemDestination, NewOrder, NewOrderItem, OrderFilter};
use kiosco_core::{Actor, Order};
use kiosco_db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub destination_id: String,
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub document_ref: Option<String>,
}

pub async fn create_order(db: &Database, actor: &Actor, request: CreateOrderRequest) -> Result<Order, ApiError> {
    debug!(destination_id = %request.destination_id, items = request.items.len(), "create_order command");

    let input = NewOrder {
        destination_id: request.destination_id,
        items: request.items,
        document_ref: request.document_ref,
        created_at: Utc::now(),
    };
    Ok(db.orders().create_order(actor, input).await?)
}

pub async fn submit_order(db: &Database, actor: &Actor, order_id: &str) -> Result<Order, ApiError> {
    debug!(order_id, "submit_order command");
    Ok(db.orders().submit_order(actor, order_id).await?)
}

pub async fn approve_order(
    db: &Database,
    actor: &Actor,
    order_id: &str,
    request: ApprovalRequest,
) -> Result<Order, ApiError> {
    debug!(order_id, sourced = request.sourced_from_warehouse, "approve_order command");
    Ok(db.orders().approve_order(actor, order_id, request).await?)
}

pub async fn reject_order(db: &Database, actor: &Actor, order_id: &str) -> Result<Order, ApiError> {
    debug!(order_id, "reject_order command");
    Ok(db.orders().reject_order(actor, order_id).await?)
}

pub async fn receive_order(
    db: &Database,
    actor: &Actor,
    order_id: &str,
    destinations: Vec<ItemDestination>,
) -> Result<Order, ApiError> {
    debug!(order_id, destinations = destinations.len(), "receive_order command");
    Ok(db.orders().receive_order(actor, order_id, destinations).await?)
}

pub async fn attach_document(
    db: &Database,
    actor: &Actor,
    order_id: &str,
    document_ref: &str,
) -> Result<Order, ApiError> {
    debug!(order_id, "attach_document command");
    Ok(db.orders().attach_document(actor, order_id, document_ref).await?)
}

/// Branch staff may only read orders addressed to their location.
pub async fn get_order(db: &Database, actor: &Actor, order_id: &str) -> Result<Order, ApiError> {
    let order = db
        .orders()
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", order_id))?;
    actor.require_location(&order.destination_id, "view orders")?;
    Ok(order)
}

pub async fn list_orders(db: &Database, actor: &Actor, mut filter: OrderFilter) -> Result<Vec<Order>, ApiError> {
    debug!(?filter, "list_orders command");
    if let Some(own) = actor.assigned_location() {
        match &filter.destination_id {
            Some(requested) => actor.require_location(requested, "view orders")?,
            None => filter.destination_id = Some(own.to_string()),
        }
    }
    Ok(db.orders().list_orders(&filter).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::stock::{adjust_stock, query_stock, StockAdjustment};
    use crate::commands::testing::Shop;
    use crate::error::ErrorCode;
    use kiosco_core::order::ItemOrigin;
    use kiosco_core::{OrderStatus, StockFilter};

    fn request(shop: &Shop, quantity: i64) -> CreateOrderRequest {
        CreateOrderRequest {
            destination_id: shop.branch.id.clone(),
            items: vec![NewOrderItem {
                product_id: shop.soda.id.clone(),
                quantity,
            }],
            document_ref: None,
        }
    }

    async fn quantity_at(shop: &Shop, sub_location_id: &str) -> i64 {
        query_stock(
            &shop.db,
            &shop.admin(),
            StockFilter {
                sub_location_id: Some(sub_location_id.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .first()
        .map(|level| level.quantity)
        .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_warehouse_sourced_lifecycle() {
        let shop = Shop::new().await;
        adjust_stock(
            &shop.db,
            &shop.admin(),
            StockAdjustment {
                product_id: shop.soda.id.clone(),
                sub_location_id: shop.warehouse_shelf.id.clone(),
                delta: 40,
            },
        )
        .await
        .unwrap();

        let order = create_order(&shop.db, &shop.clerk(), request(&shop, 10)).await.unwrap();
        assert_eq!(order.status, OrderStatus::Draft);
        let order = submit_order(&shop.db, &shop.clerk(), &order.id).await.unwrap();

        let err = approve_order(&shop.db, &shop.clerk(), &order.id, ApprovalRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let approval = ApprovalRequest {
            sourced_from_warehouse: true,
            origins: vec![ItemOrigin {
                item_id: order.items[0].id.clone(),
                sub_location_id: shop.warehouse_shelf.id.clone(),
            }],
        };
        let order = approve_order(&shop.db, &shop.admin(), &order.id, approval).await.unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(quantity_at(&shop, &shop.warehouse_shelf.id).await, 30);

        let destinations = vec![ItemDestination {
            item_id: order.items[0].id.clone(),
            sub_location_id: shop.branch_shelf.id.clone(),
        }];
        let order = receive_order(&shop.db, &shop.clerk(), &order.id, destinations.clone())
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Received);
        assert_eq!(quantity_at(&shop, &shop.branch_shelf.id).await, 10);

        let err = receive_order(&shop.db, &shop.clerk(), &order.id, destinations)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(quantity_at(&shop, &shop.branch_shelf.id).await, 10);
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_the_clerks_branch() {
        let shop = Shop::new().await;
        let order = create_order(&shop.db, &shop.clerk(), request(&shop, 2)).await.unwrap();

        let err = get_order(&shop.db, &shop.other_clerk(), &order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert!(list_orders(&shop.db, &shop.other_clerk(), OrderFilter::default())
            .await
            .unwrap()
            .is_empty());

        let mine = list_orders(&shop.db, &shop.clerk(), OrderFilter::default()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(get_order(&shop.db, &shop.admin(), &order.id).await.unwrap().id, order.id);
    }

    #[tokio::test]
    async fn test_reject_requires_pending_review() {
        let shop = Shop::new().await;
        let order = create_order(&shop.db, &shop.clerk(), request(&shop, 2)).await.unwrap();

        let err = reject_order(&shop.db, &shop.admin(), &order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);

        submit_order(&shop.db, &shop.clerk(), &order.id).await.unwrap();
        let order = reject_order(&shop.db, &shop.admin(), &order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);

        let order = attach_document(&shop.db, &shop.clerk(), &order.id, "remito-0042").await.unwrap();
        assert_eq!(order.document_ref.as_deref(), Some("remito-0042"));
    }
}
