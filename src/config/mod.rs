use std::env;
use std::path::PathBuf;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub collection: CollectionConfig,
    pub consolidation: ConsolidationConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Telemetry collection configuration
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Shared deadline for one collection fan-out, in milliseconds.
    pub timeout_ms: u64,
    /// How long a cached snapshot stays fresh, in seconds.
    pub cache_ttl_seconds: u64,
}

/// Consolidation tier configuration
#[derive(Debug, Clone)]
pub struct ConsolidationConfig {
    /// How long raw spans are kept before cleanup.
    pub raw_retention_hours: i64,
    /// Daily storage budget for the profound tier, in MB.
    pub profound_target_mb_per_day: f64,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let collection = CollectionConfig {
            timeout_ms: env::var("COLLECTION_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            cache_ttl_seconds: env::var("SNAPSHOT_CACHE_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        };

        let consolidation = ConsolidationConfig {
            raw_retention_hours: env::var("RAW_RETENTION_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24),
            profound_target_mb_per_day: env::var("PROFOUND_TARGET_MB_PER_DAY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20.0),
        };

        if consolidation.raw_retention_hours < 0 {
            return Err(AppError::Config {
                message: format!(
                    "RAW_RETENTION_HOURS must be non-negative, got {}",
                    consolidation.raw_retention_hours
                ),
            });
        }

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/telemetry.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            collection,
            consolidation,
            database,
            logging,
        })
    }
}

/// Initialize global tracing output from the logging configuration.
///
/// Logs go to stderr so callers can keep stdout for their own surface.
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            cache_ttl_seconds: 30,
        }
    }
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            raw_retention_hours: 24,
            profound_target_mb_per_day: 20.0,
        }
    }
}
