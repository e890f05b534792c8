//! # Kiosco Backoffice CLI
//!
//! Operator entry point. Acts as the configured admin and prints JSON.
//!
//! ```text
//! kiosco-backoffice migrate                 create / upgrade the database, print status
//! kiosco-backoffice locations               locations with sub-locations
//! kiosco-backoffice stock [LOCATION_ID]     stock levels
//! kiosco-backoffice orders [LOCATION_ID]    orders, newest first
//! kiosco-backoffice report [LOCATION_ID]    economic report
//! ```

use std::process::ExitCode;

use serde::Serialize;
use tracing::error;

use kiosco_backoffice::commands::{location, order, report, stock};
use kiosco_backoffice::config::BackofficeConfig;
use kiosco_backoffice::error::ApiError;
use kiosco_backoffice::{init_tracing, open_database};
use kiosco_core::order::OrderFilter;
use kiosco_core::report::ReportFilter;
use kiosco_core::{Actor, StockFilter};
use kiosco_db::migrations::migration_status;

const USAGE: &str = "usage: kiosco-backoffice <migrate|locations|stock|orders|report> [LOCATION_ID]";

#[tokio::main]
async fn main() -> ExitCode {
    let config = match BackofficeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();
    let location_id = args.next();

    match run(&config, &command, location_id).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = ?e.code, "{}", e.message);
            match serde_json::to_string_pretty(&e) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{e}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &BackofficeConfig, command: &str, location_id: Option<String>) -> Result<(), ApiError> {
    if !matches!(command, "migrate" | "locations" | "stock" | "orders" | "report") {
        return Err(ApiError::validation(USAGE));
    }

    let db = open_database(config).await?;
    let actor = Actor::admin(&config.operator);

    let result = match command {
        "migrate" => match migration_status(db.pool()).await {
            Ok(status) => print(&status),
            Err(e) => Err(e.into()),
        },
        "locations" => print(&location::list_locations(&db, &actor).await?),
        "stock" => {
            let filter = StockFilter {
                location_id,
                ..Default::default()
            };
            print(&stock::query_stock(&db, &actor, filter).await?)
        }
        "orders" => {
            let filter = OrderFilter {
                destination_id: location_id,
                status: None,
            };
            print(&order::list_orders(&db, &actor, filter).await?)
        }
        "report" => {
            let filter = ReportFilter {
                location_id,
                ..Default::default()
            };
            print(&report::economic_report(&db, &actor, filter).await?)
        }
        _ => Ok(()),
    };

    db.close().await;
    result
}

fn print<T: Serialize>(value: &T) -> Result<(), ApiError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ApiError::internal(e.to_string()))?;
    println!("{json}");
    Ok(())
}
