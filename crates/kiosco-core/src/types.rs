//! # Domain Types
//!
//! Core domain types shared by the storage layer and the backoffice.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Location     │   │    Product      │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  kind           │   │  category_id    │   │  branch_id      │       │
//! │  │  (branch |      │   │  storage_class  │   │  seller_id      │       │
//! │  │   warehouse)    │   │  price / cost   │   │  total_cents    │       │
//! │  └────────┬────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │           │ 1..N                │                     │ 1..N           │
//! │  ┌────────▼────────┐   ┌────────▼────────┐   ┌────────▼────────┐       │
//! │  │  SubLocation    │◄──┤   StockEntry    │   │    SaleItem     │       │
//! │  │  storage_class  │   │  (product,      │   │  unit price     │       │
//! │  │                 │   │   sub_location) │   │  snapshot       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Orders live in [`crate::order`]; report rows in [`crate::report`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Locations
// =============================================================================

/// What a location is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// A selling point that receives goods.
    Branch,
    /// Central storage that can source goods for branches.
    Warehouse,
}

/// Temperature class of a storage slot, and of the products kept in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    Ambient,
    Refrigerated,
    Frozen,
}

/// A physical site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub kind: LocationKind,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A storage slot inside a location (shelf, fridge, freezer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SubLocation {
    pub id: String,
    pub location_id: String,
    pub name: String,
    pub storage_class: StorageClass,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A location together with its sub-locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LocationTree {
    #[serde(flatten)]
    pub location: Location,
    pub sub_locations: Vec<SubLocation>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category (drinks, dairy, sweets...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub storage_class: StorageClass,
    /// Current sale price in cents.
    pub price_cents: i64,
    /// Current purchase cost in cents.
    pub cost_cents: i64,
    /// Optional unique SKU / barcode.
    pub sku: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }
}

/// Filters for listing products. Empty filter lists everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilter {
    pub storage_class: Option<StorageClass>,
    pub category_id: Option<String>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
}

// =============================================================================
// Stock
// =============================================================================

/// The ledger row for one product at one sub-location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockEntry {
    pub product_id: String,
    pub sub_location_id: String,
    /// Never negative.
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A stock entry joined with the names a caller needs to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub product_id: String,
    pub product_name: String,
    pub sub_location_id: String,
    pub sub_location_name: String,
    pub location_id: String,
    pub location_name: String,
    pub storage_class: StorageClass,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Filters for stock queries. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockFilter {
    pub location_id: Option<String>,
    pub sub_location_id: Option<String>,
    pub product_id: Option<String>,
    /// Skip rows whose quantity reached zero.
    #[serde(default)]
    pub non_zero_only: bool,
}

// =============================================================================
// Sale
// =============================================================================

/// A point-of-sale transaction at a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub seller_id: String,
    pub branch_id: String,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    /// Always Σ(quantity × unit_price_cents) of the items.
    pub total_cents: i64,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<SaleItem>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Recomputes the total from the items.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(SaleItem::line_total).sum()
    }
}

/// A line of a sale. Uses the snapshot pattern for the unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub position: i64,
    pub product_id: String,
    pub origin_sub_location_id: String,
    pub quantity: i64,
    /// Sale price in cents at the time of sale (frozen).
    pub unit_price_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// One requested line of a new sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    pub origin_sub_location_id: String,
    pub quantity: i64,
    /// Price snapshot the line is sold at.
    pub unit_price_cents: i64,
}

/// Input of the sale engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub branch_id: String,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    pub lines: Vec<SaleLine>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(position: i64, quantity: i64, unit_price_cents: i64) -> SaleItem {
        SaleItem {
            id: format!("item-{position}"),
            sale_id: "sale-1".to_string(),
            position,
            product_id: format!("p-{position}"),
            origin_sub_location_id: "s-1".to_string(),
            quantity,
            unit_price_cents,
        }
    }

    #[test]
    fn test_sale_items_total() {
        let sale = Sale {
            id: "sale-1".to_string(),
            seller_id: "ana".to_string(),
            branch_id: "loc-1".to_string(),
            sold_at: Utc::now(),
            total_cents: 250,
            items: vec![item(0, 2, 100), item(1, 1, 50)],
        };
        assert_eq!(sale.items_total(), sale.total());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&StorageClass::Refrigerated).unwrap(),
            "\"refrigerated\""
        );
        assert_eq!(serde_json::to_string(&LocationKind::Warehouse).unwrap(), "\"warehouse\"");
    }

    #[test]
    fn test_stock_filter_defaults_to_everything() {
        let filter: StockFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, StockFilter::default());
        assert!(!filter.non_zero_only);
    }
}
