//! # Catalog Repository
//!
//! Categories and products.
//!
//! ## Key Rules
//! - A category cannot be deleted while products reference it
//! - A product's storage class is frozen once it has any stock row
//! - Product listing filters by storage class, category and name substring,
//!   ordered by name
//!
//! Price and cost changes never touch existing order or sale items: those
//! carry their own snapshots.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::stock::product_has_entries;
use kiosco_core::validation::{validate_name, validate_price_cents, validate_search_query, validate_sku};
use kiosco_core::{Category, CoreError, Product, ProductFilter, StorageClass};

/// Input for a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category_id: String,
    pub storage_class: StorageClass,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub sku: Option<String>,
}

/// Partial product update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub storage_class: Option<StorageClass>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub sku: Option<String>,
}

const PRODUCT_COLUMNS: &str =
    "id, name, category_id, storage_class, price_cents, cost_cents, sku, created_at, updated_at";

/// Repository for categories and products.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db: Database,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(db: Database) -> Self {
        CatalogRepository { db }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Creates a category. Names are unique.
    pub async fn create_category(&self, name: &str) -> DbResult<Category> {
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: validate_name("name", name)?,
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(self.db.pool())
            .await
            .map_err(|e| unique_as(e, "categories.name", &category.name))?;

        debug!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Renames a category.
    pub async fn rename_category(&self, id: &str, name: &str) -> DbResult<Category> {
        let name = validate_name("name", name)?;

        let result = sqlx::query("UPDATE categories SET name = ?2 WHERE id = ?1")
            .bind(id)
            .bind(&name)
            .execute(self.db.pool())
            .await
            .map_err(|e| unique_as(e, "categories.name", &name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        self.get_category(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Gets a category by ID.
    pub async fn get_category(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as("SELECT id, name, created_at FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(category)
    }

    /// Lists categories ordered by name.
    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as("SELECT id, name, created_at FROM categories ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;
        Ok(categories)
    }

    /// Deletes a category that no product uses.
    pub async fn delete_category(&self, id: &str) -> DbResult<()> {
        let mut tx = self.db.begin_write().await?;

        let product_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if product_count > 0 {
            return Err(CoreError::CategoryInUse {
                category_id: id.to_string(),
                product_count,
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        tx.commit().await?;
        info!(id, "Category deleted");
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product.
    pub async fn create_product(&self, input: NewProduct) -> DbResult<Product> {
        let name = validate_name("name", &input.name)?;
        validate_price_cents("price", input.price_cents)?;
        validate_price_cents("cost", input.cost_cents)?;
        let sku = normalize_sku(input.sku)?;

        if self.get_category(&input.category_id).await?.is_none() {
            return Err(DbError::not_found("Category", &input.category_id));
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name,
            category_id: input.category_id,
            storage_class: input.storage_class,
            price_cents: input.price_cents,
            cost_cents: input.cost_cents,
            sku,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category_id, storage_class, price_cents, cost_cents, sku,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.storage_class)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(&product.sku)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| unique_as(e, "sku", product.sku.as_deref().unwrap_or_default()))?;

        Ok(product)
    }

    /// Applies a partial update.
    ///
    /// ## Storage Class Lock
    /// ```text
    /// update(storage_class: Frozen)
    ///      │
    ///      ├── same class as now?        → ok
    ///      ├── any stock row for product → StorageClassLocked
    ///      └── otherwise                 → ok
    /// ```
    pub async fn update_product(&self, id: &str, update: ProductUpdate) -> DbResult<Product> {
        let mut tx = self.db.begin_write().await?;

        let mut product = fetch_product(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if let Some(name) = update.name {
            product.name = validate_name("name", &name)?;
        }
        if let Some(category_id) = update.category_id {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = ?1)")
                .bind(&category_id)
                .fetch_one(&mut *tx)
                .await?;
            if !exists {
                return Err(DbError::not_found("Category", category_id));
            }
            product.category_id = category_id;
        }
        if let Some(storage_class) = update.storage_class {
            if storage_class != product.storage_class && product_has_entries(&mut *tx, id).await? {
                return Err(CoreError::StorageClassLocked {
                    product_id: id.to_string(),
                }
                .into());
            }
            product.storage_class = storage_class;
        }
        if let Some(price) = update.price_cents {
            validate_price_cents("price", price)?;
            product.price_cents = price;
        }
        if let Some(cost) = update.cost_cents {
            validate_price_cents("cost", cost)?;
            product.cost_cents = cost;
        }
        if update.sku.is_some() {
            product.sku = normalize_sku(update.sku)?;
        }
        product.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2, category_id = ?3, storage_class = ?4, price_cents = ?5,
                cost_cents = ?6, sku = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.storage_class)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(&product.sku)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_as(e, "sku", product.sku.as_deref().unwrap_or_default()))?;

        tx.commit().await?;
        debug!(id, "Product updated");
        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_product(&mut *conn, id).await
    }

    /// Lists products matching the filter, ordered by name.
    pub async fn list_products(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let search = match filter.search.as_deref() {
            Some(query) => validate_search_query(query)?,
            None => None,
        };

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE (?1 IS NULL OR storage_class = ?1) \
               AND (?2 IS NULL OR category_id = ?2) \
               AND (?3 IS NULL OR name LIKE '%' || ?3 || '%') \
             ORDER BY name"
        );

        let products: Vec<Product> = sqlx::query_as(&sql)
            .bind(filter.storage_class)
            .bind(filter.category_id.as_deref())
            .bind(search)
            .fetch_all(self.db.pool())
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Deletes a product. Refused with a foreign key violation while order or
    /// sale items reference it; its stock rows go with it.
    pub async fn delete_product(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id, "Product deleted");
        Ok(())
    }
}

pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await?;
    Ok(product)
}

fn normalize_sku(sku: Option<String>) -> DbResult<Option<String>> {
    match sku.map(|s| s.trim().to_string()) {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => {
            validate_sku(&s)?;
            Ok(Some(s))
        }
        None => Ok(None),
    }
}

fn unique_as(err: sqlx::Error, field: &str, value: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate(field, value),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let fx = Fixture::new().await;
        let catalog = fx.db.catalog();

        let err = catalog.delete_category(&fx.snacks.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CategoryInUse { product_count: 1, .. })
        ));

        let empty = catalog.create_category("Limpieza").await.unwrap();
        catalog.delete_category(&empty.id).await.unwrap();
        assert!(catalog.get_category(&empty.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_storage_class_locked_once_stocked() {
        let fx = Fixture::new().await;
        let catalog = fx.db.catalog();

        let moved = catalog
            .update_product(
                &fx.alfajor.id,
                ProductUpdate {
                    storage_class: Some(StorageClass::Refrigerated),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.storage_class, StorageClass::Refrigerated);

        fx.db.stock().credit(&fx.alfajor.id, &fx.branch_shelf.id, 1).await.unwrap();

        let err = catalog
            .update_product(
                &fx.alfajor.id,
                ProductUpdate {
                    storage_class: Some(StorageClass::Frozen),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::StorageClassLocked { .. })));

        // Other fields stay editable.
        let repriced = catalog
            .update_product(
                &fx.alfajor.id,
                ProductUpdate {
                    price_cents: Some(150),
                    storage_class: Some(StorageClass::Refrigerated),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(repriced.price_cents, 150);
    }

    #[tokio::test]
    async fn test_list_products_filters() {
        let fx = Fixture::new().await;
        let catalog = fx.db.catalog();

        let all = catalog.list_products(&ProductFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["Alfajor", "Yogur"]
        );

        let cold = catalog
            .list_products(&ProductFilter {
                storage_class: Some(StorageClass::Refrigerated),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cold.len(), 1);
        assert_eq!(cold[0].id, fx.yogur.id);

        let search = catalog
            .list_products(&ProductFilter {
                search: Some("ALFA".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].id, fx.alfajor.id);

        let by_category = catalog
            .list_products(&ProductFilter {
                category_id: Some(fx.snacks.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let fx = Fixture::new().await;
        let catalog = fx.db.catalog();
        let input = NewProduct {
            name: "Chocolate".to_string(),
            category_id: fx.snacks.id.clone(),
            storage_class: StorageClass::Ambient,
            price_cents: 300,
            cost_cents: 200,
            sku: Some("CHOC-1".to_string()),
        };
        catalog.create_product(input.clone()).await.unwrap();
        let err = catalog.create_product(input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "CHOC-1"));
    }

    #[tokio::test]
    async fn test_product_with_stock_is_deleted_with_its_rows() {
        let fx = Fixture::new().await;
        fx.db.stock().credit(&fx.yogur.id, &fx.branch_fridge.id, 2).await.unwrap();

        fx.db.catalog().delete_product(&fx.yogur.id).await.unwrap();
        assert!(fx
            .db
            .stock()
            .get(&fx.yogur.id, &fx.branch_fridge.id)
            .await
            .unwrap()
            .is_none());
    }
}
