//! # Sale Commands

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use kiosco_core::{Actor, NewSale, Sale, SaleLine};
use kiosco_db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub branch_id: String,
    pub lines: Vec<SaleRequestLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequestLine {
    pub product_id: String,
    pub origin_sub_location_id: String,
    pub quantity: i64,
}

/// Sells at the catalog price current at call time.
pub async fn create_sale(db: &Database, actor: &Actor, request: CreateSaleRequest) -> Result<Sale, ApiError> {
    debug!(branch_id = %request.branch_id, lines = request.lines.len(), "create_sale command");

    let catalog = db.catalog();
    let mut lines = Vec::with_capacity(request.lines.len());
    for line in request.lines {
        let product = catalog
            .get_product(&line.product_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", &line.product_id))?;
        lines.push(SaleLine {
            product_id: line.product_id,
            origin_sub_location_id: line.origin_sub_location_id,
            quantity: line.quantity,
            unit_price_cents: product.price_cents,
        });
    }

    let input = NewSale {
        branch_id: request.branch_id,
        sold_at: Utc::now(),
        lines,
    };
    Ok(db.sales().process_sale(actor, input).await?)
}

pub async fn get_sale(db: &Database, actor: &Actor, sale_id: &str) -> Result<Sale, ApiError> {
    let sale = db
        .sales()
        .get_sale(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;
    actor.require_location(&sale.branch_id, "view sales")?;
    Ok(sale)
}

/// Newest first. Branch staff always get their own branch.
pub async fn list_sales(db: &Database, actor: &Actor, branch_id: Option<&str>) -> Result<Vec<Sale>, ApiError> {
    debug!(?branch_id, "list_sales command");
    let branch_id = match (actor.assigned_location(), branch_id) {
        (Some(_), Some(requested)) => {
            actor.require_location(requested, "view sales")?;
            Some(requested)
        }
        (Some(own), None) => Some(own),
        (None, requested) => requested,
    };
    Ok(db.sales().list_sales(branch_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::catalog::update_product;
    use crate::commands::stock::{adjust_stock, StockAdjustment};
    use crate::commands::testing::Shop;
    use crate::error::ErrorCode;
    use kiosco_db::ProductUpdate;

    async fn stock_branch(shop: &Shop, delta: i64) {
        adjust_stock(
            &shop.db,
            &shop.admin(),
            StockAdjustment {
                product_id: shop.soda.id.clone(),
                sub_location_id: shop.branch_shelf.id.clone(),
                delta,
            },
        )
        .await
        .unwrap();
    }

    fn request(shop: &Shop, quantity: i64) -> CreateSaleRequest {
        CreateSaleRequest {
            branch_id: shop.branch.id.clone(),
            lines: vec![SaleRequestLine {
                product_id: shop.soda.id.clone(),
                origin_sub_location_id: shop.branch_shelf.id.clone(),
                quantity,
            }],
        }
    }

    #[tokio::test]
    async fn test_sale_uses_current_catalog_price() {
        let shop = Shop::new().await;
        stock_branch(&shop, 10).await;

        let first = create_sale(&shop.db, &shop.clerk(), request(&shop, 2)).await.unwrap();
        assert_eq!(first.total_cents, 300);

        update_product(
            &shop.db,
            &shop.admin(),
            &shop.soda.id,
            ProductUpdate {
                price_cents: Some(175),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let second = create_sale(&shop.db, &shop.clerk(), request(&shop, 1)).await.unwrap();
        assert_eq!(second.total_cents, 175);

        // The earlier sale keeps its snapshot.
        let first = get_sale(&shop.db, &shop.clerk(), &first.id).await.unwrap();
        assert_eq!(first.items[0].unit_price_cents, 150);
    }

    #[tokio::test]
    async fn test_short_stock_reports_the_line() {
        let shop = Shop::new().await;
        stock_branch(&shop, 1).await;

        let err = create_sale(&shop.db, &shop.clerk(), request(&shop, 3)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        let details = err.details.unwrap();
        assert_eq!(details["available"], 1);
        assert_eq!(details["requested"], 3);
        assert!(list_sales(&shop.db, &shop.admin(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sales_are_scoped_to_the_clerks_branch() {
        let shop = Shop::new().await;
        stock_branch(&shop, 5).await;
        let sale = create_sale(&shop.db, &shop.clerk(), request(&shop, 1)).await.unwrap();

        let err = create_sale(&shop.db, &shop.other_clerk(), request(&shop, 1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err = get_sale(&shop.db, &shop.other_clerk(), &sale.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert!(list_sales(&shop.db, &shop.other_clerk(), None).await.unwrap().is_empty());

        let err = list_sales(&shop.db, &shop.other_clerk(), Some(&shop.branch.id))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        assert_eq!(list_sales(&shop.db, &shop.clerk(), None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let shop = Shop::new().await;
        let mut req = request(&shop, 1);
        req.lines[0].product_id = "no-such-product".to_string();
        let err = create_sale(&shop.db, &shop.clerk(), req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
