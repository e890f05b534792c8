//! # Stock Ledger
//!
//! The `stock` table is the only record of how many units of a product sit
//! in a sub-location. Every write goes through [`credit`] or [`debit`].
//!
//! ## Mutation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  credit(P, S, n)                      debit(P, S, n)                    │
//! │  ───────────────                      ──────────────                    │
//! │  row absent? insert at 0              UPDATE ... SET q = q - n          │
//! │  q = q + n                            WHERE q >= n                      │
//! │  updated_at = now                       │                               │
//! │                                         ├── 1 row  → ok, return q       │
//! │                                         └── 0 rows → InsufficientStock  │
//! │                                              (absent row = available 0) │
//! │                                                                         │
//! │  Both run on the caller's transaction connection. Engines open that     │
//! │  transaction with BEGIN IMMEDIATE, so the row cannot change between     │
//! │  the availability check and the write.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The schema's `CHECK (quantity >= 0)` backs the guarded UPDATE.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::catalog::fetch_product;
use crate::repository::location::fetch_sub_location;
use kiosco_core::error::ValidationError;
use kiosco_core::{CoreError, StockEntry, StockFilter, StockLevel};

// =============================================================================
// Ledger primitives
// =============================================================================

fn require_positive(amount: i64) -> Result<(), ValidationError> {
    if amount <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Adds `amount` units, creating the row if needed. Returns the new quantity.
pub(crate) async fn credit(
    conn: &mut SqliteConnection,
    product_id: &str,
    sub_location_id: &str,
    amount: i64,
    at: DateTime<Utc>,
) -> DbResult<i64> {
    require_positive(amount)?;

    let quantity: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO stock (product_id, sub_location_id, quantity, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (product_id, sub_location_id) DO UPDATE SET
            quantity = quantity + excluded.quantity,
            updated_at = excluded.updated_at
        RETURNING quantity
        "#,
    )
    .bind(product_id)
    .bind(sub_location_id)
    .bind(amount)
    .bind(at)
    .fetch_one(&mut *conn)
    .await?;

    debug!(product_id, sub_location_id, amount, quantity, "Stock credited");
    Ok(quantity)
}

/// Removes `amount` units. Fails with `InsufficientStock` and leaves the row
/// untouched if fewer are available. Returns the new quantity.
pub(crate) async fn debit(
    conn: &mut SqliteConnection,
    product_id: &str,
    sub_location_id: &str,
    amount: i64,
    at: DateTime<Utc>,
) -> DbResult<i64> {
    require_positive(amount)?;

    let updated: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE stock
        SET quantity = quantity - ?3, updated_at = ?4
        WHERE product_id = ?1 AND sub_location_id = ?2 AND quantity >= ?3
        RETURNING quantity
        "#,
    )
    .bind(product_id)
    .bind(sub_location_id)
    .bind(amount)
    .bind(at)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(quantity) = updated {
        debug!(product_id, sub_location_id, amount, quantity, "Stock debited");
        return Ok(quantity);
    }

    let available = fetch_quantity(conn, product_id, sub_location_id).await?;
    let product_name = fetch_product(conn, product_id)
        .await?
        .map(|p| p.name)
        .unwrap_or_else(|| product_id.to_string());

    warn!(
        product_id,
        sub_location_id, available, requested = amount, "Debit refused, insufficient stock"
    );

    Err(CoreError::InsufficientStock {
        product_id: product_id.to_string(),
        product_name,
        sub_location_id: sub_location_id.to_string(),
        available,
        requested: amount,
    }
    .into())
}

/// Current quantity; 0 when the row does not exist.
pub(crate) async fn fetch_quantity(
    conn: &mut SqliteConnection,
    product_id: &str,
    sub_location_id: &str,
) -> DbResult<i64> {
    let quantity: Option<i64> =
        sqlx::query_scalar("SELECT quantity FROM stock WHERE product_id = ?1 AND sub_location_id = ?2")
            .bind(product_id)
            .bind(sub_location_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(quantity.unwrap_or(0))
}

/// Whether any stock row exists for the product, whatever its quantity.
pub(crate) async fn product_has_entries(conn: &mut SqliteConnection, product_id: &str) -> DbResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM stock WHERE product_id = ?1)")
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

// =============================================================================
// Repository
// =============================================================================

/// Public face of the ledger: single-row adjustments and queries.
///
/// Order and sale engines do not use this type. They call the ledger
/// primitives on their own transaction so the whole workflow commits or
/// rolls back together.
#[derive(Debug, Clone)]
pub struct StockRepository {
    db: Database,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(db: Database) -> Self {
        StockRepository { db }
    }

    /// Credits one row in its own write transaction.
    pub async fn credit(&self, product_id: &str, sub_location_id: &str, amount: i64) -> DbResult<StockEntry> {
        let mut tx = self.db.begin_write().await?;
        ensure_row_targets(&mut *tx, product_id, sub_location_id).await?;
        credit(&mut *tx, product_id, sub_location_id, amount, Utc::now()).await?;
        let entry = fetch_entry(&mut *tx, product_id, sub_location_id)
            .await?
            .ok_or_else(|| DbError::not_found("StockEntry", format!("{product_id}/{sub_location_id}")))?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Debits one row in its own write transaction.
    pub async fn debit(&self, product_id: &str, sub_location_id: &str, amount: i64) -> DbResult<StockEntry> {
        let mut tx = self.db.begin_write().await?;
        ensure_row_targets(&mut *tx, product_id, sub_location_id).await?;
        debit(&mut *tx, product_id, sub_location_id, amount, Utc::now()).await?;
        let entry = fetch_entry(&mut *tx, product_id, sub_location_id)
            .await?
            .ok_or_else(|| DbError::not_found("StockEntry", format!("{product_id}/{sub_location_id}")))?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Gets the ledger row for (product, sub-location).
    pub async fn get(&self, product_id: &str, sub_location_id: &str) -> DbResult<Option<StockEntry>> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_entry(&mut *conn, product_id, sub_location_id).await
    }

    /// Lists stock rows matching every set filter, ordered by location,
    /// sub-location and product name.
    pub async fn query(&self, filter: &StockFilter) -> DbResult<Vec<StockLevel>> {
        let levels = sqlx::query_as(
            r#"
            SELECT
                s.product_id,
                p.name  AS product_name,
                s.sub_location_id,
                sl.name AS sub_location_name,
                l.id    AS location_id,
                l.name  AS location_name,
                sl.storage_class,
                s.quantity,
                s.updated_at
            FROM stock s
            JOIN products p       ON p.id = s.product_id
            JOIN sub_locations sl ON sl.id = s.sub_location_id
            JOIN locations l      ON l.id = sl.location_id
            WHERE (?1 IS NULL OR l.id = ?1)
              AND (?2 IS NULL OR s.sub_location_id = ?2)
              AND (?3 IS NULL OR s.product_id = ?3)
              AND (?4 = 0 OR s.quantity > 0)
            ORDER BY l.name, sl.name, p.name
            "#,
        )
        .bind(filter.location_id.as_deref())
        .bind(filter.sub_location_id.as_deref())
        .bind(filter.product_id.as_deref())
        .bind(filter.non_zero_only)
        .fetch_all(self.db.pool())
        .await?;

        Ok(levels)
    }
}

async fn fetch_entry(
    conn: &mut SqliteConnection,
    product_id: &str,
    sub_location_id: &str,
) -> DbResult<Option<StockEntry>> {
    let entry = sqlx::query_as(
        "SELECT product_id, sub_location_id, quantity, updated_at \
         FROM stock WHERE product_id = ?1 AND sub_location_id = ?2",
    )
    .bind(product_id)
    .bind(sub_location_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(entry)
}

async fn ensure_row_targets(conn: &mut SqliteConnection, product_id: &str, sub_location_id: &str) -> DbResult<()> {
    if fetch_product(conn, product_id).await?.is_none() {
        return Err(DbError::not_found("Product", product_id));
    }
    if fetch_sub_location(conn, sub_location_id).await?.is_none() {
        return Err(DbError::not_found("SubLocation", sub_location_id));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_credit_creates_row_lazily() {
        let fx = Fixture::new().await;
        let stock = fx.db.stock();

        assert!(stock.get(&fx.alfajor.id, &fx.branch_shelf.id).await.unwrap().is_none());

        let entry = stock.credit(&fx.alfajor.id, &fx.branch_shelf.id, 5).await.unwrap();
        assert_eq!(entry.quantity, 5);
        let entry = stock.credit(&fx.alfajor.id, &fx.branch_shelf.id, 3).await.unwrap();
        assert_eq!(entry.quantity, 8);
    }

    #[tokio::test]
    async fn test_over_debit_is_refused_and_ledger_unchanged() {
        let fx = Fixture::new().await;
        let stock = fx.db.stock();
        stock.credit(&fx.alfajor.id, &fx.branch_shelf.id, 3).await.unwrap();

        let err = stock.debit(&fx.alfajor.id, &fx.branch_shelf.id, 5).await.unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_name, "Alfajor");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let entry = stock.get(&fx.alfajor.id, &fx.branch_shelf.id).await.unwrap().unwrap();
        assert_eq!(entry.quantity, 3);

        let entry = stock.debit(&fx.alfajor.id, &fx.branch_shelf.id, 3).await.unwrap();
        assert_eq!(entry.quantity, 0);
    }

    #[tokio::test]
    async fn test_debit_of_absent_row_reports_zero_available() {
        let fx = Fixture::new().await;
        let err = fx
            .db
            .stock()
            .debit(&fx.alfajor.id, &fx.branch_shelf.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 0, requested: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let fx = Fixture::new().await;
        let stock = fx.db.stock();
        assert!(matches!(
            stock.credit(&fx.alfajor.id, &fx.branch_shelf.id, 0).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert!(matches!(
            stock.debit(&fx.alfajor.id, &fx.branch_shelf.id, -2).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_unknown_targets_are_not_found() {
        let fx = Fixture::new().await;
        let err = fx.db.stock().credit("nope", &fx.branch_shelf.id, 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_query_filters_and_ordering() {
        let fx = Fixture::new().await;
        let stock = fx.db.stock();
        stock.credit(&fx.alfajor.id, &fx.branch_shelf.id, 4).await.unwrap();
        stock.credit(&fx.yogur.id, &fx.branch_fridge.id, 2).await.unwrap();
        stock.credit(&fx.alfajor.id, &fx.warehouse_shelf.id, 100).await.unwrap();
        stock.debit(&fx.yogur.id, &fx.branch_fridge.id, 2).await.unwrap();

        let all = stock.query(&StockFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        // "Depósito Central" sorts before "Sucursal Centro"
        assert_eq!(all[0].location_id, fx.warehouse.id);

        let branch_only = stock
            .query(&StockFilter {
                location_id: Some(fx.branch.id.clone()),
                non_zero_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(branch_only.len(), 1);
        assert_eq!(branch_only[0].product_name, "Alfajor");
        assert_eq!(branch_only[0].sub_location_name, "Góndola");

        let by_product = stock
            .query(&StockFilter {
                product_id: Some(fx.yogur.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_product.len(), 1);
        assert_eq!(by_product[0].quantity, 0);
    }
}
