//! # Error Types
//!
//! Domain-specific error types for kiosco-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kiosco-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kiosco-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Backoffice errors (in app)                                            │
//! │  └── ApiError         - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, sub-location, item)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::order::{OrderAction, OrderStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is recoverable at the caller boundary. Variants that concern
/// a specific line carry enough identifiers for the caller to point at it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The order is not in the state required by the requested action.
    ///
    /// ## When This Occurs
    /// - Submitting an order that is not a draft
    /// - Approving or rejecting an order that is not pending review
    /// - Receiving an order twice
    #[error("Order {order_id} is {from}, cannot {action}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        action: OrderAction,
    },

    /// A debit exceeds the quantity held at a sub-location.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 5 × Alfajor from "Mostrador"
    ///      │
    ///      ▼
    /// Lock stock row: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_name: "Alfajor", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolled back, caller shows "Only 3 Alfajor in Mostrador"
    /// ```
    #[error(
        "Insufficient stock for {product_name} at sub-location {sub_location_id}: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        product_name: String,
        sub_location_id: String,
        available: i64,
        requested: i64,
    },

    /// An order item reached receipt without a destination sub-location.
    #[error("Item {item_id} ({product_name}) of order {order_id} has no destination sub-location")]
    MissingDestination {
        order_id: String,
        item_id: String,
        product_name: String,
    },

    /// An approval or receipt names an item the order does not have.
    #[error("Order {order_id} has no item {item_id}")]
    UnknownItem { order_id: String, item_id: String },

    /// A warehouse-sourced approval lacks an origin for some item.
    #[error("Item {item_id} ({product_name}) of order {order_id} has no origin sub-location")]
    MissingOrigin {
        order_id: String,
        item_id: String,
        product_name: String,
    },

    /// A sub-location was used somewhere it does not belong.
    ///
    /// ## When This Occurs
    /// - Receiving into a sub-location of another location
    /// - Sourcing an approval from a branch instead of a warehouse
    /// - Selling from a sub-location outside the sale's branch
    #[error("Sub-location {sub_location_id} cannot be used here: {reason}")]
    InvalidSubLocation {
        sub_location_id: String,
        reason: String,
    },

    /// The actor lacks the capability for the requested action.
    #[error("User {user_id} is not allowed to {action}")]
    Forbidden { user_id: String, action: String },

    /// Storage class cannot change once stock exists for the product.
    #[error("Product {product_id} already has stock, its storage class cannot change")]
    StorageClassLocked { product_id: String },

    /// Category still has products attached.
    #[error("Category {category_id} still has {product_count} products")]
    CategoryInUse {
        category_id: String,
        product_count: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a Forbidden error.
    pub fn forbidden(user_id: impl Into<String>, action: impl Into<String>) -> Self {
        CoreError::Forbidden {
            user_id: user_id.into(),
            action: action.into(),
        }
    }

    /// Creates an InvalidSubLocation error.
    pub fn invalid_sub_location(id: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidSubLocation {
            sub_location_id: id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid SKU).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The same entity appears twice where it must be unique.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// An amount computed from valid inputs does not fit in cents.
    #[error("{field} exceeds the largest representable amount")]
    Overflow { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_names_product() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "Alfajor".to_string(),
            sub_location_id: "s-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Alfajor at sub-location s-1: available 3, requested 5"
        );
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = CoreError::InvalidTransition {
            order_id: "o-1".to_string(),
            from: OrderStatus::Approved,
            action: OrderAction::Reject,
        };
        assert_eq!(err.to_string(), "Order o-1 is approved, cannot reject");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
