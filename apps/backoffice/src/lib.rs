//! # Kiosco Backoffice Library
//!
//! Command layer over `kiosco-db`, shared by the CLI binary and any
//! transport an admin UI sits behind.
//!
//! ## Module Organization
//! ```text
//! kiosco_backoffice/
//! ├── lib.rs          ◄─── You are here (startup helpers)
//! ├── config.rs       ◄─── BackofficeConfig (env > kiosco.toml > defaults)
//! ├── error.rs        ◄─── ApiError returned by every command
//! └── commands/
//!     ├── location.rs ◄─── Locations and sub-locations
//!     ├── catalog.rs  ◄─── Categories and products
//!     ├── stock.rs    ◄─── Stock queries and adjustments
//!     ├── order.rs    ◄─── Order lifecycle
//!     ├── sale.rs     ◄─── Sales
//!     └── report.rs   ◄─── Economic report
//! ```
//!
//! ## Startup Sequence
//! 1. Load configuration
//! 2. Initialize tracing (logging)
//! 3. Create the database directory, connect, run migrations
//! 4. Dispatch commands

pub mod commands;
pub mod config;
pub mod error;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::BackofficeConfig;
use error::ApiError;
use kiosco_db::Database;

/// Initializes the global tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=kiosco_db=trace` - Show trace for the database crate only
/// - Default: `config.log`
pub fn init_tracing(config: &BackofficeConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Opens (creating if needed) the configured database and runs migrations.
pub async fn open_database(config: &BackofficeConfig) -> Result<Database, ApiError> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::internal(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
    }

    let db = Database::new(config.db_config()).await?;
    info!(path = %config.database_path.display(), "Database ready");
    Ok(db)
}
