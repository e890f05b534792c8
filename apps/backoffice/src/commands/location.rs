//! # Location Commands

use tracing::debug;

use crate::error::ApiError;
use kiosco_core::{Actor, Location, LocationKind, LocationTree, StorageClass, SubLocation};
use kiosco_db::Database;

pub async fn create_location(
    db: &Database,
    actor: &Actor,
    name: &str,
    kind: LocationKind,
) -> Result<Location, ApiError> {
    debug!(name, ?kind, "create_location command");
    actor.require_admin("create locations")?;
    Ok(db.locations().create_location(name, kind).await?)
}

pub async fn add_sub_location(
    db: &Database,
    actor: &Actor,
    location_id: &str,
    name: &str,
    storage_class: StorageClass,
) -> Result<SubLocation, ApiError> {
    debug!(location_id, name, ?storage_class, "add_sub_location command");
    actor.require_admin("create sub-locations")?;
    Ok(db.locations().add_sub_location(location_id, name, storage_class).await?)
}

/// Every location with its sub-locations, ordered by name.
pub async fn list_locations(db: &Database, _actor: &Actor) -> Result<Vec<LocationTree>, ApiError> {
    debug!("list_locations command");
    Ok(db.locations().list().await?)
}

pub async fn get_location(db: &Database, _actor: &Actor, id: &str) -> Result<LocationTree, ApiError> {
    debug!(id, "get_location command");
    db.locations()
        .get_tree(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Location", id))
}

/// Deletes a location, its sub-locations, their stock and the orders and
/// sales addressed to it.
pub async fn delete_location(db: &Database, actor: &Actor, id: &str) -> Result<(), ApiError> {
    debug!(id, "delete_location command");
    actor.require_admin("delete locations")?;
    Ok(db.locations().delete(id).await?)
}
