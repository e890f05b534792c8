//! # Report Repository
//!
//! Loads the raw rows behind the economic report and hands them to
//! `kiosco_core::report::build_report`.
//!
//! All three reads run in one deferred transaction so the locations, order
//! items and sales come from the same snapshot.

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::location::fetch_location;
use kiosco_core::report::{build_report, EconomicReport, ExpenseRow, ReportFilter, RevenueRow};
use kiosco_core::{Location, ValidationError};

#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: Database,
}

impl ReportRepository {
    pub fn new(db: Database) -> Self {
        ReportRepository { db }
    }

    /// Expense, revenue and balance per location.
    ///
    /// With `filter.location_id` set, only that location is reported; an
    /// unknown ID is `NotFound`.
    pub async fn economic_report(&self, filter: &ReportFilter) -> DbResult<EconomicReport> {
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
            if from > to {
                return Err(ValidationError::InvalidFormat {
                    field: "date_to".to_string(),
                    reason: "must not be earlier than date_from".to_string(),
                }
                .into());
            }
        }

        let mut tx = self.db.pool().begin().await?;

        let locations: Vec<Location> = match filter.location_id.as_deref() {
            Some(id) => vec![fetch_location(&mut *tx, id)
                .await?
                .ok_or_else(|| DbError::not_found("Location", id))?],
            None => {
                sqlx::query_as("SELECT id, name, kind, created_at FROM locations ORDER BY name")
                    .fetch_all(&mut *tx)
                    .await?
            }
        };

        let expenses: Vec<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT o.destination_id, o.status, o.created_at, oi.quantity, oi.unit_cost_cents
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.status = 'received'
              AND (?1 IS NULL OR o.destination_id = ?1)
            "#,
        )
        .bind(filter.location_id.as_deref())
        .fetch_all(&mut *tx)
        .await?;

        let revenue: Vec<RevenueRow> = sqlx::query_as(
            "SELECT branch_id, sold_at, total_cents FROM sales WHERE (?1 IS NULL OR branch_id = ?1)",
        )
        .bind(filter.location_id.as_deref())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            locations = locations.len(),
            expense_rows = expenses.len(),
            revenue_rows = revenue.len(),
            "Building economic report"
        );

        Ok(build_report(&locations, &expenses, &revenue, filter)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
