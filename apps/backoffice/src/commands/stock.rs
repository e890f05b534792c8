//! # Stock Commands
//!
//! Branch staff see only the stock of their own location. Manual
//! adjustments (supplier deliveries into the warehouse, inventory counts)
//! are admin only; everything else moves stock through orders and sales.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use kiosco_core::{Actor, StockEntry, StockFilter, StockLevel};
use kiosco_db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: String,
    pub sub_location_id: String,
    /// Positive credits, negative debits.
    pub delta: i64,
}

pub async fn query_stock(db: &Database, actor: &Actor, filter: StockFilter) -> Result<Vec<StockLevel>, ApiError> {
    debug!(?filter, "query_stock command");
    let filter = scope_to_actor(actor, filter)?;
    Ok(db.stock().query(&filter).await?)
}

pub async fn adjust_stock(db: &Database, actor: &Actor, adjustment: StockAdjustment) -> Result<StockEntry, ApiError> {
    debug!(?adjustment, "adjust_stock command");
    actor.require_admin("adjust stock")?;

    let stock = db.stock();
    let entry = match adjustment.delta {
        0 => return Err(ApiError::validation("delta must not be zero")),
        delta if delta > 0 => {
            stock
                .credit(&adjustment.product_id, &adjustment.sub_location_id, delta)
                .await?
        }
        delta => {
            let amount = delta
                .checked_neg()
                .ok_or_else(|| ApiError::validation("delta is out of range"))?;
            stock
                .debit(&adjustment.product_id, &adjustment.sub_location_id, amount)
                .await?
        }
    };

    info!(
        product_id = %entry.product_id,
        sub_location_id = %entry.sub_location_id,
        delta = adjustment.delta,
        quantity = entry.quantity,
        user = %actor.user_id,
        "Stock adjusted"
    );
    Ok(entry)
}

/// Pins a branch actor's filter to their own location.
fn scope_to_actor(actor: &Actor, mut filter: StockFilter) -> Result<StockFilter, ApiError> {
    if let Some(own) = actor.assigned_location() {
        match &filter.location_id {
            Some(requested) => actor.require_location(requested, "view stock")?,
            None => filter.location_id = Some(own.to_string()),
        }
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Shop;
    use crate::error::ErrorCode;

    fn adjustment(shop: &Shop, sub_location_id: &str, delta: i64) -> StockAdjustment {
        StockAdjustment {
            product_id: shop.soda.id.clone(),
            sub_location_id: sub_location_id.to_string(),
            delta,
        }
    }

    #[tokio::test]
    async fn test_clerk_only_sees_own_location() {
        let shop = Shop::new().await;
        adjust_stock(&shop.db, &shop.admin(), adjustment(&shop, &shop.warehouse_shelf.id, 40))
            .await
            .unwrap();
        adjust_stock(&shop.db, &shop.admin(), adjustment(&shop, &shop.branch_shelf.id, 6))
            .await
            .unwrap();

        let all = query_stock(&shop.db, &shop.admin(), StockFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let own = query_stock(&shop.db, &shop.clerk(), StockFilter::default()).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].quantity, 6);
        assert_eq!(own[0].location_name, "Kiosco Plaza");

        let err = query_stock(
            &shop.db,
            &shop.clerk(),
            StockFilter {
                location_id: Some(shop.warehouse.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_negative_adjustment_never_goes_below_zero() {
        let shop = Shop::new().await;
        adjust_stock(&shop.db, &shop.admin(), adjustment(&shop, &shop.warehouse_shelf.id, 3))
            .await
            .unwrap();

        let err = adjust_stock(&shop.db, &shop.admin(), adjustment(&shop, &shop.warehouse_shelf.id, -4))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let entry = adjust_stock(&shop.db, &shop.admin(), adjustment(&shop, &shop.warehouse_shelf.id, -3))
            .await
            .unwrap();
        assert_eq!(entry.quantity, 0);

        let err = adjust_stock(&shop.db, &shop.clerk(), adjustment(&shop, &shop.branch_shelf.id, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
