//! # Backoffice Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`KIOSCO_*`)
//! 2. Config file (`kiosco.toml`)
//! 3. Defaults (this file)
//!
//! The config file is read from `KIOSCO_CONFIG` when set, otherwise from the
//! platform config directory:
//! - **Linux**: `~/.config/kiosco-backoffice/kiosco.toml`
//! - **macOS**: `~/Library/Application Support/com.kiosco.backoffice/kiosco.toml`
//! - **Windows**: `%APPDATA%\kiosco\backoffice\config\kiosco.toml`
//!
//! A missing file is not an error; a malformed one is.
//!
//! ```toml
//! database_path = "/var/lib/kiosco/kiosco.db"
//! max_connections = 8
//! lock_timeout_ms = 3000
//! log = "info,kiosco_db=debug"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kiosco_db::DbConfig;

pub const CONFIG_FILE_NAME: &str = "kiosco.toml";

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackofficeConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Pool size. Default: 5
    pub max_connections: u32,

    /// How long a stock-mutating workflow waits for the write lock.
    /// Default: 5000 ms
    pub lock_timeout_ms: u64,

    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub log: String,

    /// User ID the CLI acts as (always an admin).
    pub operator: String,
}

/// The optional subset a `kiosco.toml` may set.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    database_path: Option<PathBuf>,
    max_connections: Option<u32>,
    lock_timeout_ms: Option<u64>,
    log: Option<String>,
    operator: Option<String>,
}

impl Default for BackofficeConfig {
    fn default() -> Self {
        BackofficeConfig {
            database_path: default_database_path(),
            max_connections: 5,
            lock_timeout_ms: 5_000,
            log: "info,kiosco_db=debug,sqlx=warn".to_string(),
            operator: "admin".to_string(),
        }
    }
}

impl BackofficeConfig {
    /// Loads configuration from the process environment and config file.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var_os("KIOSCO_CONFIG")
            .map(PathBuf::from)
            .or_else(|| project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME)));

        Self::load_from(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Loads configuration from an explicit file and variable lookup.
    pub fn load_from(file: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = BackofficeConfig::default();

        if let Some(path) = file {
            if path.exists() {
                let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let overrides: FileConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
                config.apply_file(overrides);
                debug!(path = %path.display(), "Loaded config file");
            }
        }

        if let Some(path) = env("KIOSCO_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(max) = env("KIOSCO_MAX_CONNECTIONS") {
            config.max_connections = max
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KIOSCO_MAX_CONNECTIONS".to_string()))?;
        }
        if let Some(ms) = env("KIOSCO_LOCK_TIMEOUT_MS") {
            config.lock_timeout_ms = ms
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KIOSCO_LOCK_TIMEOUT_MS".to_string()))?;
        }
        if let Some(log) = env("KIOSCO_LOG") {
            config.log = log;
        }
        if let Some(operator) = env("KIOSCO_OPERATOR") {
            config.operator = operator;
        }

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }

        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(path) = file.database_path {
            self.database_path = path;
        }
        if let Some(max) = file.max_connections {
            self.max_connections = max;
        }
        if let Some(ms) = file.lock_timeout_ms {
            self.lock_timeout_ms = ms;
        }
        if let Some(log) = file.log {
            self.log = log;
        }
        if let Some(operator) = file.operator {
            self.operator = operator;
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .lock_timeout(self.lock_timeout())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "kiosco", "backoffice")
}

/// `<data dir>/kiosco.db`, or `./kiosco.db` when no home directory exists.
fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("kiosco.db"))
        .unwrap_or_else(|| PathBuf::from("kiosco.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
