//! # Report Commands

use tracing::{debug, info};

use crate::error::ApiError;
use kiosco_core::report::{EconomicReport, ReportFilter};
use kiosco_core::Actor;
use kiosco_db::Database;

/// Expenses, revenue and balance per location. Admin only.
pub async fn economic_report(db: &Database, actor: &Actor, filter: ReportFilter) -> Result<EconomicReport, ApiError> {
    debug!(?filter, "economic_report command");
    actor.require_admin("view the economic report")?;

    let report = db.reports().economic_report(&filter).await?;
    info!(
        locations = report.by_location.len(),
        balance = %report.totals.balance,
        "Economic report generated"
    );
    Ok(report)
}
