//! # Schema Migrations
//!
//! The backoffice schema lives in `migrations/sqlite/` and is embedded at
//! compile time.
//!
//! ```text
//! locations ──< sub_locations ──< stock >── products >── categories
//!     │                                        │
//!     ├──< orders ──< order_items ─────────────┤
//!     │                                        │
//!     └──< sales ───< sale_items ──────────────┘
//! ```
//!
//! - `stock.quantity` is guarded by `CHECK (quantity >= 0)`; the ledger never
//!   relies on it alone, but it is the last line against a negative balance.
//! - Deleting a location cascades to its sub-locations, stock, orders and
//!   sales. Products referenced by order or sale items are RESTRICTed.
//! - `sale_items.sale_id` is `DEFERRABLE INITIALLY DEFERRED`: the sale engine
//!   writes items before the sale row, inside one transaction.
//!
//! Applied migrations are recorded in sqlx's `_sqlx_migrations` table.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration the database has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(available = MIGRATOR.migrations.len(), "Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// One migration as recorded in `_sqlx_migrations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMigration {
    pub version: i64,
    pub description: String,
}

/// What `migrate` reports to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    pub applied: Vec<AppliedMigration>,
    /// Versions embedded in this build and not yet applied.
    pub pending: Vec<i64>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Compares the embedded migrations with the ones the database recorded.
///
/// A database that never ran migrations has no `_sqlx_migrations` table and
/// reports every migration as pending.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let tracked: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;

    let applied: Vec<AppliedMigration> = if tracked {
        sqlx::query_as("SELECT version, description FROM _sqlx_migrations WHERE success = 1 ORDER BY version")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    let pending: Vec<i64> = MIGRATOR
        .migrations
        .iter()
        .map(|migration| migration.version)
        .filter(|version| !applied.iter().any(|done| done.version == *version))
        .collect();

    debug!(applied = applied.len(), pending = pending.len(), "Migration status");
    Ok(MigrationStatus { applied, pending })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_fresh_database_is_up_to_date() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let status = migration_status(db.pool()).await.unwrap();

        assert!(status.is_up_to_date());
        assert_eq!(status.applied[0].version, 1);
        assert_eq!(status.applied[0].description, "initial schema");
    }

    #[tokio::test]
    async fn test_untracked_database_reports_pending() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false)).await.unwrap();

        let status = migration_status(db.pool()).await.unwrap();
        assert!(status.applied.is_empty());
        assert_eq!(status.pending, vec![1]);

        db.run_migrations().await.unwrap();
        assert!(migration_status(db.pool()).await.unwrap().is_up_to_date());
    }
}
