//! # Location Repository
//!
//! Branches, warehouses and the storage slots inside them.
//!
//! ```text
//! Location "Sucursal Centro" (branch)
//!   ├── SubLocation "Góndola"     (ambient)
//!   ├── SubLocation "Heladera 1"  (refrigerated)
//!   └── SubLocation "Freezer"     (frozen)
//! ```
//!
//! Deleting a location cascades to its sub-locations, their stock rows, and
//! the orders and sales of the location.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use kiosco_core::validation::validate_name;
use kiosco_core::{Location, LocationKind, LocationTree, StorageClass, SubLocation};

/// Repository for locations and sub-locations.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    db: Database,
}

impl LocationRepository {
    /// Creates a new LocationRepository.
    pub fn new(db: Database) -> Self {
        LocationRepository { db }
    }

    /// Creates a location. Names are unique.
    pub async fn create_location(&self, name: &str, kind: LocationKind) -> DbResult<Location> {
        let name = validate_name("name", name)?;
        let location = Location {
            id: Uuid::new_v4().to_string(),
            name,
            kind,
            created_at: Utc::now(),
        };

        debug!(id = %location.id, name = %location.name, "Inserting location");

        sqlx::query("INSERT INTO locations (id, name, kind, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&location.id)
            .bind(&location.name)
            .bind(location.kind)
            .bind(location.created_at)
            .execute(self.db.pool())
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, location.name.clone()),
                other => other,
            })?;

        info!(id = %location.id, kind = ?location.kind, "Location created");
        Ok(location)
    }

    /// Adds a storage slot to an existing location.
    pub async fn add_sub_location(
        &self,
        location_id: &str,
        name: &str,
        storage_class: StorageClass,
    ) -> DbResult<SubLocation> {
        let name = validate_name("name", name)?;

        if self.get(location_id).await?.is_none() {
            return Err(DbError::not_found("Location", location_id));
        }

        let sub = SubLocation {
            id: Uuid::new_v4().to_string(),
            location_id: location_id.to_string(),
            name,
            storage_class,
            created_at: Utc::now(),
        };

        debug!(id = %sub.id, location_id, name = %sub.name, "Inserting sub-location");

        sqlx::query(
            "INSERT INTO sub_locations (id, location_id, name, storage_class, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&sub.id)
        .bind(&sub.location_id)
        .bind(&sub.name)
        .bind(sub.storage_class)
        .bind(sub.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("sub_locations.name", sub.name.clone()),
            other => other,
        })?;

        Ok(sub)
    }

    /// Gets a location by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Location>> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_location(&mut *conn, id).await
    }

    /// Gets a location with its sub-locations.
    pub async fn get_tree(&self, id: &str) -> DbResult<Option<LocationTree>> {
        let Some(location) = self.get(id).await? else {
            return Ok(None);
        };
        let sub_locations = self.sub_locations_of(id).await?;
        Ok(Some(LocationTree {
            location,
            sub_locations,
        }))
    }

    /// Lists every location, ordered by name, with nested sub-locations.
    pub async fn list(&self) -> DbResult<Vec<LocationTree>> {
        let locations = self.list_flat().await?;

        let subs: Vec<SubLocation> = sqlx::query_as(
            "SELECT id, location_id, name, storage_class, created_at \
             FROM sub_locations ORDER BY name",
        )
        .fetch_all(self.db.pool())
        .await?;

        let trees = locations
            .into_iter()
            .map(|location| {
                let sub_locations = subs
                    .iter()
                    .filter(|s| s.location_id == location.id)
                    .cloned()
                    .collect();
                LocationTree {
                    location,
                    sub_locations,
                }
            })
            .collect();

        Ok(trees)
    }

    /// Lists every location ordered by name, without sub-locations.
    pub async fn list_flat(&self) -> DbResult<Vec<Location>> {
        let locations = sqlx::query_as("SELECT id, name, kind, created_at FROM locations ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;
        Ok(locations)
    }

    /// Sub-locations of one location, ordered by name.
    pub async fn sub_locations_of(&self, location_id: &str) -> DbResult<Vec<SubLocation>> {
        let subs = sqlx::query_as(
            "SELECT id, location_id, name, storage_class, created_at \
             FROM sub_locations WHERE location_id = ?1 ORDER BY name",
        )
        .bind(location_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(subs)
    }

    /// Gets a sub-location by ID.
    pub async fn get_sub_location(&self, id: &str) -> DbResult<Option<SubLocation>> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_sub_location(&mut *conn, id).await
    }

    /// Deletes a location and everything that belongs to it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Location", id));
        }

        info!(id, "Location deleted");
        Ok(())
    }
}

// =============================================================================
// Connection-level lookups (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_location(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Location>> {
    let location = sqlx::query_as("SELECT id, name, kind, created_at FROM locations WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(location)
}

pub(crate) async fn fetch_sub_location(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<SubLocation>> {
    let sub = sqlx::query_as(
        "SELECT id, location_id, name, storage_class, created_at FROM sub_locations WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(sub)
}

/// Loads a sub-location together with the kind of its parent location.
pub(crate) async fn fetch_sub_location_with_kind(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<(SubLocation, LocationKind)> {
    let sub = fetch_sub_location(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("SubLocation", id))?;
    let location = fetch_location(conn, &sub.location_id)
        .await?
        .ok_or_else(|| DbError::not_found("Location", &sub.location_id))?;
    Ok((sub, location.kind))
}

// =============================================================================
// Unit Tests
// =============================================================================
