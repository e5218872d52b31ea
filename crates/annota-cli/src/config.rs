//! Environment configuration for the operator CLI.

use std::path::PathBuf;

use annota_db::{Error, PoolConfig, Result};

/// Database URL used when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/annota";

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "annota=info,annota_db=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging settings read from `LOG_FORMAT`, `LOG_FILE` and `LOG_ANSI`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Enables daily-rotated file output in place of stderr.
    pub file: Option<PathBuf>,
    /// Overrides ANSI colour detection.
    pub ansi: Option<bool>,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        Self {
            format,
            file: lookup("LOG_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            ansi: lookup("LOG_ANSI").map(|v| v == "true" || v == "1"),
        }
    }
}

/// Database settings for a CLI run.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub database_url: String,
    pub pool: PoolConfig,
    /// Apply pending migrations before every command.
    pub run_migrations: bool,
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let run_migrations = match lookup("RUN_MIGRATIONS").as_deref().map(str::trim) {
            None | Some("") | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(Error::Config(format!(
                    "RUN_MIGRATIONS must be true or false, got {:?}",
                    other
                )))
            }
        };
        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            pool: PoolConfig::from_lookup(&lookup)?,
            run_migrations,
        })
    }
}
