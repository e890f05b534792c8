//! # Repository Module
//!
//! Database repository implementations for the Kiosco backoffice.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Engines                             │
//! │                                                                         │
//! │  Backoffice Command                                                    │
//! │       │                                                                 │
//! │       │  db.sales().process_sale(&actor, new_sale)                     │
//! │       ▼                                                                 │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐          │
//! │  │ OrderRepository│   │ SaleRepository │   │ReportRepository│          │
//! │  │ (order engine) │   │ (sale engine)  │   │  (read only)   │          │
//! │  └───────┬────────┘   └───────┬────────┘   └────────────────┘          │
//! │          │  same transaction  │                                         │
//! │          ▼                    ▼                                         │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │  stock::credit / stock::debit           │  ← the only writers of    │
//! │  │  (StockRepository wraps them)           │    the `stock` table      │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  LocationRepository, CatalogRepository: plain CRUD                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`location::LocationRepository`] - Locations and sub-locations
//! - [`catalog::CatalogRepository`] - Categories and products
//! - [`stock::StockRepository`] - Stock ledger
//! - [`order::OrderRepository`] - Order lifecycle engine
//! - [`sale::SaleRepository`] - Sale engine
//! - [`report::ReportRepository`] - Economic report

pub mod catalog;
pub mod location;
pub mod order;
pub mod report;
pub mod sale;
pub mod stock;
