//! # Validation Module
//!
//! Input validation for the backoffice.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command (Rust)                                               │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: field rules, line rules                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engines (kiosco-db)                                          │
//! │  ├── Authorization, state machine                                      │
//! │  └── Stock availability under the write lock                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0)                                             │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use kiosco_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("ALF-001").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::order::NewOrder;
use crate::types::NewSale;
use crate::{MAX_ITEM_QUANTITY, MAX_LINES, MAX_NAME_LEN, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use kiosco_core::validation::validate_sku;
///
/// assert!(validate_sku("ALF-001").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product, category, location, sub-location).
///
/// Returns the trimmed name.
///
/// ```rust
/// use kiosco_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Heladera 1 ").unwrap(), "Heladera 1");
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates a product search string. Empty means "no filter".
pub fn validate_search_query(query: &str) -> ValidationResult<Option<String>> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok((!query.is_empty()).then(|| query.to_string()))
}

/// Validates an opaque document reference. Only emptiness and length are
/// checked, the content is never interpreted.
pub fn validate_document_ref(reference: &str) -> ValidationResult<()> {
    if reference.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "document_ref".to_string(),
        });
    }
    if reference.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "document_ref".to_string(),
            max: 500,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or cost in cents. Zero is allowed.
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_PRICE_CENTS
///
/// ```rust
/// use kiosco_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("price", 1099).is_ok());
/// assert!(validate_price_cents("cost", 0).is_ok());
/// assert!(validate_price_cents("price", -100).is_err());
/// assert!(validate_price_cents("price", i64::MAX).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

fn validate_line_count(field: &str, count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if count > MAX_LINES {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_LINES as i64,
        });
    }
    Ok(())
}

/// Checks a new order's shape: at least one item, valid quantities.
pub fn validate_new_order(order: &NewOrder) -> ValidationResult<()> {
    validate_line_count("items", order.items.len())?;
    for item in &order.items {
        validate_uuid("product_id", &item.product_id)?;
        validate_quantity(item.quantity)?;
    }
    if let Some(reference) = &order.document_ref {
        validate_document_ref(reference)?;
    }
    Ok(())
}

/// Checks a new sale's shape: at least one line, valid quantities and prices.
///
/// The same product may appear on several lines, even from the same origin;
/// each line is debited on its own.
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    validate_line_count("lines", sale.lines.len())?;
    for line in &sale.lines {
        validate_quantity(line.quantity)?;
        validate_price_cents("unit_price", line.unit_price_cents)?;
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use kiosco_core::validation::validate_uuid;
///
/// assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::NewOrderItem;
    use crate::types::SaleLine;
    use chrono::Utc;

    const P1: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("ALF-001").is_ok());
        assert!(validate_sku("leche_1l").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "Lácteos").unwrap(), "Lácteos");
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  ").unwrap(), None);
        assert_eq!(validate_search_query(" coca ").unwrap(), Some("coca".to_string()));
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_new_order() {
        let mut order = NewOrder {
            destination_id: "loc-1".to_string(),
            items: vec![],
            document_ref: None,
            created_at: Utc::now(),
        };
        assert_eq!(
            validate_new_order(&order),
            Err(ValidationError::Required {
                field: "items".to_string()
            })
        );

        order.items.push(NewOrderItem {
            product_id: P1.to_string(),
            quantity: 0,
        });
        assert!(validate_new_order(&order).is_err());

        order.items[0].quantity = 10;
        assert!(validate_new_order(&order).is_ok());
    }

    #[test]
    fn test_validate_price_cents_bounds() {
        assert!(validate_price_cents("price", MAX_PRICE_CENTS).is_ok());
        assert_eq!(
            validate_price_cents("price", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange {
                field: "price".to_string(),
                min: 0,
                max: MAX_PRICE_CENTS,
            })
        );
        assert!(validate_price_cents("cost", i64::MAX / 2 + 1).is_err());
    }

    #[test]
    fn test_validate_new_sale() {
        let line = SaleLine {
            product_id: P1.to_string(),
            origin_sub_location_id: "s-1".to_string(),
            quantity: 1,
            unit_price_cents: 100,
        };
        let sale = NewSale {
            branch_id: "loc-1".to_string(),
            sold_at: Utc::now(),
            lines: vec![line.clone(), line.clone()],
        };
        assert!(validate_new_sale(&sale).is_ok());

        let overpriced = NewSale {
            lines: vec![SaleLine {
                unit_price_cents: i64::MAX / 2 + 1,
                ..line
            }],
            ..sale.clone()
        };
        assert!(matches!(
            validate_new_sale(&overpriced),
            Err(ValidationError::OutOfRange { .. })
        ));

        let empty = NewSale { lines: vec![], ..sale };
        assert!(validate_new_sale(&empty).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", P1).is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }
}
