//! # Commands Module
//!
//! One async function per backoffice operation. Every command takes the
//! database handle and the calling [`Actor`](kiosco_core::Actor) explicitly
//! and returns `Result<T, ApiError>`.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── location.rs  ◄─── Locations and sub-locations
//! ├── catalog.rs   ◄─── Categories and products
//! ├── stock.rs     ◄─── Stock queries and manual adjustments
//! ├── order.rs     ◄─── Order lifecycle
//! ├── sale.rs      ◄─── Point-of-sale transactions
//! └── report.rs    ◄─── Economic report
//! ```
//!
//! ## Authorization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Admin                          Branch { location_id }                  │
//! │  ─────                          ──────────────────────                  │
//! │  everything                     orders & sales for own location         │
//! │                                 stock of own location                   │
//! │                                 read catalog & locations                │
//! │                                                                         │
//! │  Catalog / location administration, approve / reject and the           │
//! │  economic report are admin only.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod location;
pub mod order;
pub mod report;
pub mod sale;
pub mod stock;
