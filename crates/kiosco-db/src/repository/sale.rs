//! # Sale Engine
//!
//! Records point-of-sale transactions and depletes branch stock.
//!
//! ## Processing a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       process_sale                                      │
//! │                                                                         │
//! │  BEGIN IMMEDIATE                                                       │
//! │    for each line:                                                      │
//! │      1. origin must belong to the sale's branch                        │
//! │      2. debit (product, origin) by quantity  ← InsufficientStock?      │
//! │      3. insert sale item (price snapshot)       → drop tx, nothing     │
//! │      4. total += quantity × unit price            was written          │
//! │    insert sale row with the accumulated total                          │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Items are written before the sale row; the foreign key from           │
//! │  sale_items to sales is deferred to COMMIT.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::catalog::fetch_product;
use crate::repository::location::{fetch_location, fetch_sub_location};
use crate::repository::stock;
use kiosco_core::validation::validate_new_sale;
use kiosco_core::{Actor, CoreError, Money, NewSale, Sale, SaleItem, ValidationError};

/// Repository and engine for sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    db: Database,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(db: Database) -> Self {
        SaleRepository { db }
    }

    /// Processes a sale atomically.
    ///
    /// ## Returns
    /// * `Ok(Sale)` - Persisted sale with its items
    /// * `Err(DbError::Domain(InsufficientStock))` - Some line was short;
    ///   no stock moved and no sale exists
    pub async fn process_sale(&self, actor: &Actor, input: NewSale) -> DbResult<Sale> {
        validate_new_sale(&input)?;
        actor.require_location(&input.branch_id, "sell")?;

        let mut tx = self.db.begin_write().await?;

        if fetch_location(&mut *tx, &input.branch_id).await?.is_none() {
            return Err(DbError::not_found("Location", &input.branch_id));
        }

        let sale_id = Uuid::new_v4().to_string();
        let mut total = Money::zero();
        let mut items = Vec::with_capacity(input.lines.len());

        for (position, line) in input.lines.iter().enumerate() {
            let origin = fetch_sub_location(&mut *tx, &line.origin_sub_location_id)
                .await?
                .ok_or_else(|| DbError::not_found("SubLocation", &line.origin_sub_location_id))?;
            if origin.location_id != input.branch_id {
                return Err(CoreError::invalid_sub_location(
                    &origin.id,
                    format!("{} is not in the selling branch", origin.name),
                )
                .into());
            }

            if fetch_product(&mut *tx, &line.product_id).await?.is_none() {
                return Err(DbError::not_found("Product", &line.product_id));
            }

            stock::debit(&mut *tx, &line.product_id, &origin.id, line.quantity, input.sold_at).await?;

            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                position: position as i64,
                product_id: line.product_id.clone(),
                origin_sub_location_id: origin.id,
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
            };
            insert_item(&mut *tx, &item).await?;

            total = Money::from_cents(item.unit_price_cents)
                .checked_multiply_quantity(item.quantity)
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| ValidationError::Overflow {
                    field: "total".to_string(),
                })?;
            items.push(item);
        }

        let sale = Sale {
            id: sale_id,
            seller_id: actor.user_id.clone(),
            branch_id: input.branch_id,
            sold_at: input.sold_at,
            total_cents: total.cents(),
            items,
        };

        sqlx::query(
            "INSERT INTO sales (id, seller_id, branch_id, sold_at, total_cents) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&sale.id)
        .bind(&sale.seller_id)
        .bind(&sale.branch_id)
        .bind(sale.sold_at)
        .bind(sale.total_cents)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            branch_id = %sale.branch_id,
            items = sale.items.len(),
            total = %sale.total(),
            "Sale processed"
        );
        Ok(sale)
    }

    /// Gets a sale with its items.
    pub async fn get_sale(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.db.pool().acquire().await?;

        let sale: Option<Sale> =
            sqlx::query_as("SELECT id, seller_id, branch_id, sold_at, total_cents FROM sales WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        match sale {
            Some(mut sale) => {
                sale.items = fetch_items(&mut *conn, &sale.id).await?;
                Ok(Some(sale))
            }
            None => Ok(None),
        }
    }

    /// Lists sales newest first, optionally for a single branch.
    pub async fn list_sales(&self, branch_id: Option<&str>) -> DbResult<Vec<Sale>> {
        let mut conn = self.db.pool().acquire().await?;

        let mut sales: Vec<Sale> = sqlx::query_as(
            "SELECT id, seller_id, branch_id, sold_at, total_cents FROM sales \
             WHERE (?1 IS NULL OR branch_id = ?1) \
             ORDER BY sold_at DESC, id",
        )
        .bind(branch_id)
        .fetch_all(&mut *conn)
        .await?;

        for sale in &mut sales {
            sale.items = fetch_items(&mut *conn, &sale.id).await?;
        }

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }
}

async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, position, product_id, origin_sub_location_id, quantity, unit_price_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(item.position)
    .bind(&item.product_id)
    .bind(&item.origin_sub_location_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as(
        "SELECT id, sale_id, position, product_id, origin_sub_location_id, quantity, unit_price_cents \
         FROM sale_items WHERE sale_id = ?1 ORDER BY position",
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================
