//! # Economic Report
//!
//! Per-location expense / revenue / balance, aggregated from rows the storage
//! layer hands over.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  expenses(loc) = Σ qty × unit_cost   over items of RECEIVED orders      │
//! │                                      with destination = loc,            │
//! │                                      created_at within the range        │
//! │                                                                         │
//! │  revenue(loc)  = Σ sale.total        over sales at loc,                 │
//! │                                      sold_at within the range           │
//! │                                                                         │
//! │  balance(loc)  = revenue − expenses                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both bounds of the range are inclusive. A missing bound is open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::order::OrderStatus;
use crate::types::Location;

/// Restricts the report to one location and / or a time range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportFilter {
    pub location_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub date_from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub date_to: Option<DateTime<Utc>>,
}

impl ReportFilter {
    /// Whether `at` falls within the inclusive date range.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.date_from.map_or(true, |from| at >= from) && self.date_to.map_or(true, |to| at <= to)
    }
}

/// One order item as the report sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExpenseRow {
    pub destination_id: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// One sale as the report sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RevenueRow {
    pub branch_id: String,
    pub sold_at: DateTime<Utc>,
    pub total_cents: i64,
}

/// Balance of a single location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LocationBalance {
    pub location_id: String,
    pub location_name: String,
    pub expenses: Money,
    pub revenue: Money,
    pub balance: Money,
}

/// Sums over every reported location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportTotals {
    pub expenses: Money,
    pub revenue: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EconomicReport {
    pub by_location: Vec<LocationBalance>,
    pub totals: ReportTotals,
}

/// Builds the report for `locations` in the order given.
///
/// Rows outside the filter's range, orders that are not received, and rows
/// of locations not listed are ignored. A sum that does not fit in cents is
/// `ValidationError::Overflow`.
///
/// ```rust
/// use chrono::Utc;
/// use kiosco_core::report::{build_report, ExpenseRow, ReportFilter, RevenueRow};
/// use kiosco_core::order::OrderStatus;
/// use kiosco_core::types::{Location, LocationKind};
///
/// let now = Utc::now();
/// let loc = Location { id: "b".into(), name: "Centro".into(), kind: LocationKind::Branch, created_at: now };
/// let expenses = [ExpenseRow {
///     destination_id: "b".into(),
///     status: OrderStatus::Received,
///     created_at: now,
///     quantity: 10,
///     unit_cost_cents: 5,
/// }];
/// let revenue = [RevenueRow { branch_id: "b".into(), sold_at: now, total_cents: 80 }];
///
/// let report = build_report(&[loc], &expenses, &revenue, &ReportFilter::default()).unwrap();
/// assert_eq!(report.totals.balance.cents(), 30);
/// ```
pub fn build_report(
    locations: &[Location],
    expenses: &[ExpenseRow],
    revenue: &[RevenueRow],
    filter: &ReportFilter,
) -> CoreResult<EconomicReport> {
    let mut by_location = Vec::with_capacity(locations.len());

    for location in locations {
        let costs = expenses
            .iter()
            .filter(|row| {
                row.destination_id == location.id
                    && row.status == OrderStatus::Received
                    && filter.contains(row.created_at)
            })
            .map(|row| Money::from_cents(row.unit_cost_cents).checked_multiply_quantity(row.quantity))
            .collect::<Option<Vec<Money>>>()
            .ok_or_else(|| overflow("expenses"))?;
        let spent = Money::checked_sum(costs).ok_or_else(|| overflow("expenses"))?;

        let earned = Money::checked_sum(
            revenue
                .iter()
                .filter(|row| row.branch_id == location.id && filter.contains(row.sold_at))
                .map(|row| Money::from_cents(row.total_cents)),
        )
        .ok_or_else(|| overflow("revenue"))?;

        by_location.push(LocationBalance {
            location_id: location.id.clone(),
            location_name: location.name.clone(),
            expenses: spent,
            revenue: earned,
            balance: earned.checked_sub(spent).ok_or_else(|| overflow("balance"))?,
        });
    }

    let expenses = Money::checked_sum(by_location.iter().map(|row| row.expenses)).ok_or_else(|| overflow("expenses"))?;
    let revenue = Money::checked_sum(by_location.iter().map(|row| row.revenue)).ok_or_else(|| overflow("revenue"))?;
    let totals = ReportTotals {
        expenses,
        revenue,
        balance: revenue.checked_sub(expenses).ok_or_else(|| overflow("balance"))?,
    };

    Ok(EconomicReport { by_location, totals })
}

fn overflow(field: &str) -> CoreError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocationKind;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn location(id: &str, name: &str) -> Location {
        Location {
            id: id.to_string(),
            name: name.to_string(),
            kind: LocationKind::Branch,
            created_at: at(1),
        }
    }

    fn expense(dest: &str, status: OrderStatus, day: u32, quantity: i64, cost: i64) -> ExpenseRow {
        ExpenseRow {
            destination_id: dest.to_string(),
            status,
            created_at: at(day),
            quantity,
            unit_cost_cents: cost,
        }
    }

    fn sale(branch: &str, day: u32, total: i64) -> RevenueRow {
        RevenueRow {
            branch_id: branch.to_string(),
            sold_at: at(day),
            total_cents: total,
        }
    }

    #[test]
    fn test_single_order_and_sale() {
        let report = build_report(
            &[location("b1", "Centro")],
            &[expense("b1", OrderStatus::Received, 2, 10, 5)],
            &[sale("b1", 3, 80)],
            &ReportFilter::default(),
        )
        .unwrap();

        let row = &report.by_location[0];
        assert_eq!(row.expenses, Money::from_cents(50));
        assert_eq!(row.revenue, Money::from_cents(80));
        assert_eq!(row.balance, Money::from_cents(30));
        assert_eq!(report.totals.balance, Money::from_cents(30));
    }

    #[test]
    fn test_only_received_orders_count() {
        let expenses = [
            expense("b1", OrderStatus::Approved, 2, 10, 5),
            expense("b1", OrderStatus::PendingReview, 2, 1, 1000),
            expense("b1", OrderStatus::Received, 2, 1, 7),
        ];
        let report = build_report(&[location("b1", "Centro")], &expenses, &[], &ReportFilter::default()).unwrap();
        assert_eq!(report.totals.expenses, Money::from_cents(7));
        assert_eq!(report.totals.balance, Money::from_cents(-7));
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let filter = ReportFilter {
            location_id: None,
            date_from: Some(at(2)),
            date_to: Some(at(4)),
        };
        assert!(filter.contains(at(2)));
        assert!(filter.contains(at(4)));
        assert!(!filter.contains(at(4) + Duration::seconds(1)));
        assert!(!filter.contains(at(1)));

        let revenue = [sale("b1", 1, 100), sale("b1", 2, 10), sale("b1", 4, 20), sale("b1", 5, 1000)];
        let report = build_report(&[location("b1", "Centro")], &[], &revenue, &filter).unwrap();
        assert_eq!(report.totals.revenue, Money::from_cents(30));
    }

    #[test]
    fn test_rows_per_location_and_totals() {
        let locations = [location("b1", "Centro"), location("b2", "Norte")];
        let expenses = [
            expense("b1", OrderStatus::Received, 2, 2, 100),
            expense("b2", OrderStatus::Received, 2, 1, 300),
        ];
        let revenue = [sale("b1", 2, 500), sale("b2", 2, 100), sale("gone", 2, 9999)];
        let report = build_report(&locations, &expenses, &revenue, &ReportFilter::default()).unwrap();

        assert_eq!(report.by_location.len(), 2);
        assert_eq!(report.by_location[0].balance, Money::from_cents(300));
        assert_eq!(report.by_location[1].balance, Money::from_cents(-200));
        assert_eq!(report.totals.expenses, Money::from_cents(500));
        assert_eq!(report.totals.revenue, Money::from_cents(600));
        assert_eq!(report.totals.balance, Money::from_cents(100));
    }

    #[test]
    fn test_location_without_activity_reports_zero() {
        let report = build_report(&[location("w", "Depósito")], &[], &[], &ReportFilter::default()).unwrap();
        assert_eq!(report.by_location[0].balance, Money::zero());
        assert_eq!(report.totals, ReportTotals::default());
    }

    #[test]
    fn test_sums_that_overflow_are_errors() {
        let half = i64::MAX / 2 + 1;
        let revenue = [sale("b1", 2, half), sale("b1", 3, half)];
        let err = build_report(&[location("b1", "Centro")], &[], &revenue, &ReportFilter::default()).unwrap_err();
        assert_eq!(
            err,
            CoreError::Validation(ValidationError::Overflow {
                field: "revenue".to_string()
            })
        );

        let expenses = [expense("b1", OrderStatus::Received, 2, 2, half)];
        let err = build_report(&[location("b1", "Centro")], &expenses, &[], &ReportFilter::default()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Overflow { .. })));
    }
}
