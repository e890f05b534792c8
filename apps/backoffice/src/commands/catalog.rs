//! # Catalog Commands
//!
//! Categories and products. Reads are open to every actor; changes are
//! admin only.

use tracing::debug;

use crate::error::ApiError;
use kiosco_core::{Actor, Category, Product, ProductFilter};
use kiosco_db::{Database, NewProduct, ProductUpdate};

pub async fn create_category(db: &Database, actor: &Actor, name: &str) -> Result<Category, ApiError> {
    debug!(name, "create_category command");
    actor.require_admin("manage categories")?;
    Ok(db.catalog().create_category(name).await?)
}

pub async fn rename_category(db: &Database, actor: &Actor, id: &str, name: &str) -> Result<Category, ApiError> {
    debug!(id, name, "rename_category command");
    actor.require_admin("manage categories")?;
    Ok(db.catalog().rename_category(id, name).await?)
}

/// Fails with `CONFLICT` while products still use the category.
pub async fn delete_category(db: &Database, actor: &Actor, id: &str) -> Result<(), ApiError> {
    debug!(id, "delete_category command");
    actor.require_admin("manage categories")?;
    Ok(db.catalog().delete_category(id).await?)
}

pub async fn list_categories(db: &Database, _actor: &Actor) -> Result<Vec<Category>, ApiError> {
    Ok(db.catalog().list_categories().await?)
}

pub async fn create_product(db: &Database, actor: &Actor, input: NewProduct) -> Result<Product, ApiError> {
    debug!(name = %input.name, "create_product command");
    actor.require_admin("manage products")?;
    Ok(db.catalog().create_product(input).await?)
}

pub async fn update_product(
    db: &Database,
    actor: &Actor,
    id: &str,
    update: ProductUpdate,
) -> Result<Product, ApiError> {
    debug!(id, "update_product command");
    actor.require_admin("manage products")?;
    Ok(db.catalog().update_product(id, update).await?)
}

pub async fn delete_product(db: &Database, actor: &Actor, id: &str) -> Result<(), ApiError> {
    debug!(id, "delete_product command");
    actor.require_admin("manage products")?;
    Ok(db.catalog().delete_product(id).await?)
}

pub async fn get_product(db: &Database, _actor: &Actor, id: &str) -> Result<Product, ApiError> {
    db.catalog()
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))
}

pub async fn list_products(db: &Database, _actor: &Actor, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
    debug!(?filter, "list_products command");
    Ok(db.catalog().list_products(filter).await?)
}
