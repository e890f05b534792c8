//! # API Error Type
//!
//! Unified error type for backoffice commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Backoffice                         │
//! │                                                                         │
//! │  Command Function                                                       │
//! │  Result<T, ApiError>                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Database Error? ──── DbError::LockTimeout ──────────┐                  │
//! │         │                                            │                  │
//! │         ▼                                            ▼                  │
//! │  Domain Error? ────── CoreError::InsufficientStock ─ ApiError ────────► │
//! │         │             (wrapped in DbError::Domain)   { code,            │
//! │         ▼                                              message,         │
//! │  Success ─────────────────────────────────────────►    details }        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `details` carries the identifiers a client needs to point at the failing
//! line: product, sub-location, item, quantities.

use serde::Serialize;
use serde_json::{json, Value};

use kiosco_core::{CoreError, ValidationError};
use kiosco_db::DbError;

/// Error returned from every command.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Alfajor at sub-location ...",
///   "details": { "productId": "...", "available": 3, "requested": 5 }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Caller lacks the capability (403)
    Forbidden,

    /// Order is not in the state the action needs (409)
    InvalidTransition,

    /// A debit exceeded the available quantity (409)
    InsufficientStock,

    MissingOrigin,

    MissingDestination,

    /// Sub-location used outside its location (422)
    InvalidSubLocation,

    /// Duplicate value or a resource still in use (409)
    Conflict,

    /// Write lock or pool unavailable; safe to retry (503)
    Busy,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
            .with_details(json!({ "entity": resource, "id": id }))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.code == ErrorCode::Busy
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            )
            .with_details(json!({ "field": field, "value": value })),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::Conflict, "Resource is referenced by other records")
            }
            DbError::ConnectionFailed(_) => ApiError::new(ErrorCode::DatabaseError, "Database connection failed"),
            DbError::MigrationFailed(_) => ApiError::new(ErrorCode::DatabaseError, "Database migration failed"),
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => ApiError::new(ErrorCode::Busy, "Database pool exhausted, try again"),
            DbError::LockTimeout => ApiError::new(ErrorCode::Busy, "Database is busy, try again"),
            DbError::Domain(e) => ApiError::from(e),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::InvalidTransition { order_id, from, action } => {
                ApiError::new(ErrorCode::InvalidTransition, message).with_details(json!({
                    "orderId": order_id,
                    "status": from.as_str(),
                    "action": action.to_string(),
                }))
            }
            CoreError::InsufficientStock {
                product_id,
                product_name,
                sub_location_id,
                available,
                requested,
            } => ApiError::new(ErrorCode::InsufficientStock, message).with_details(json!({
                "productId": product_id,
                "productName": product_name,
                "subLocationId": sub_location_id,
                "available": available,
                "requested": requested,
            })),
            CoreError::MissingDestination {
                order_id,
                item_id,
                product_name,
            } => ApiError::new(ErrorCode::MissingDestination, message).with_details(json!({
                "orderId": order_id,
                "itemId": item_id,
                "productName": product_name,
            })),
            CoreError::MissingOrigin {
                order_id,
                item_id,
                product_name,
            } => ApiError::new(ErrorCode::MissingOrigin, message).with_details(json!({
                "orderId": order_id,
                "itemId": item_id,
                "productName": product_name,
            })),
            CoreError::UnknownItem { order_id, item_id } => ApiError::new(ErrorCode::NotFound, message)
                .with_details(json!({ "entity": "OrderItem", "orderId": order_id, "id": item_id })),
            CoreError::InvalidSubLocation { sub_location_id, .. } => {
                ApiError::new(ErrorCode::InvalidSubLocation, message)
                    .with_details(json!({ "subLocationId": sub_location_id }))
            }
            CoreError::Forbidden { user_id, action } => ApiError::new(ErrorCode::Forbidden, message)
                .with_details(json!({ "userId": user_id, "action": action })),
            CoreError::StorageClassLocked { product_id } => {
                ApiError::new(ErrorCode::Conflict, message).with_details(json!({ "productId": product_id }))
            }
            CoreError::CategoryInUse {
                category_id,
                product_count,
            } => ApiError::new(ErrorCode::Conflict, message).with_details(json!({
                "categoryId": category_id,
                "productCount": product_count,
            })),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosco_core::{OrderAction, OrderStatus};

    #[test]
    fn test_insufficient_stock_carries_line_details() {
        let err: ApiError = DbError::Domain(CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "Alfajor".to_string(),
            sub_location_id: "s-1".to_string(),
            available: 3,
            requested: 5,
        })
        .into();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
        assert_eq!(json["details"]["available"], 3);
        assert_eq!(json["details"]["productName"], "Alfajor");
    }

    #[test]
    fn test_invalid_transition_code() {
        let err: ApiError = CoreError::InvalidTransition {
            order_id: "o-1".to_string(),
            from: OrderStatus::Draft,
            action: OrderAction::Reject,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(err.details.unwrap()["status"], "draft");
    }

    #[test]
    fn test_busy_errors_are_retryable() {
        assert!(ApiError::from(DbError::LockTimeout).is_retryable());
        assert!(ApiError::from(DbError::PoolExhausted).is_retryable());
        assert!(!ApiError::from(DbError::not_found("Order", "x")).is_retryable());
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let err: ApiError = CoreError::UnknownItem {
            order_id: "o-1".to_string(),
            item_id: "i-9".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err: ApiError = DbError::from(ValidationError::Required {
            field: "items".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("items"));
        assert!(serde_json::to_value(&err).unwrap().get("details").is_none());
    }
}
