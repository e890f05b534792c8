//! # kiosco-core: Pure Business Logic for the Kiosco Backoffice
//!
//! This crate holds the rules of the inventory backend as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kiosco Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Backoffice Commands (apps/backoffice)           │   │
//! │  │    create_order, approve_order, create_sale, economic_report   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kiosco-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐       │   │
//! │  │   │  order   │  │  report  │  │ identity │  │validation│       │   │
//! │  │   │  states  │  │ balance  │  │  Actor   │  │  rules   │       │   │
//! │  │   │  plans   │  │  totals  │  │  Role    │  │  checks  │       │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────┘       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kiosco-db (Database Layer)                   │   │
//! │  │        SQLite, migrations, stock ledger, order & sale engines   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Locations, catalog, stock and sale types
//! - [`order`] - Order state machine and approval / receipt planning
//! - [`report`] - Economic report aggregation
//! - [`identity`] - Caller identity and role checks
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kiosco_core::order::{OrderAction, OrderStatus};
//! use kiosco_core::Actor;
//!
//! let clerk = Actor::branch("ana", "loc-1");
//! assert_eq!(OrderStatus::initial_for(&clerk.role), OrderStatus::Draft);
//! assert_eq!(OrderStatus::Draft.next(OrderAction::Submit), Some(OrderStatus::PendingReview));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod identity;
pub mod money;
pub mod order;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use identity::{Actor, Role};
pub use money::Money;
pub use order::{Order, OrderAction, OrderItem, OrderStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single order item or sale line.
///
/// ## Business Reason
/// Catches typos (1000 instead of 10) before they reach the ledger.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum number of lines in one order or sale.
pub const MAX_LINES: usize = 200;

/// Maximum catalog price or cost in cents ($100,000,000.00).
///
/// A full sale (`MAX_LINES` lines of `MAX_ITEM_QUANTITY` units at this price)
/// stays far below `i64::MAX`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Maximum length of display names.
pub const MAX_NAME_LEN: usize = 120;
