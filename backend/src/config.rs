//! Configuration management for the stock ledger server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with LEDGER__ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// External API access (scales, integrations)
    pub external_api: ExternalApiConfig,

    /// Inventory behaviour
    pub inventory: InventoryConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,

    /// Apply pending migrations at start-up
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying HS256 access tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExternalApiConfig {
    pub enabled: bool,

    /// Bearer key accepted on /external routes
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Balances below this appear in the low-stock report
    pub low_stock_threshold: Decimal,

    /// Attempts at drawing an unused lot number before giving up
    pub lot_number_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("LEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.run_migrations", environment == "development")?
            .set_default("external_api.enabled", true)?
            .set_default("external_api.api_key", "")?
            .set_default("inventory.low_stock_threshold", "10")?
            .set_default("inventory.lot_number_attempts", 5)?
            .set_default("logging.json", environment == "production")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LEDGER__ prefix)
            .add_source(
                Environment::with_prefix("LEDGER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(AppError::Configuration("jwt.secret must be set".to_string()));
        }
        if self.inventory.lot_number_attempts == 0 {
            return Err(AppError::Configuration(
                "inventory.lot_number_attempts must be at least 1".to_string(),
            ));
        }
        if self.inventory.low_stock_threshold.is_sign_negative() {
            return Err(AppError::Configuration(
                "inventory.low_stock_threshold cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

#[cfg(test)]
impl Config {
    /// Settings for unit tests; the database URL is never dialled
    pub(crate) fn for_tests() -> Self {
        Config {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/ledger".to_string(),
                max_connections: 5,
                min_connections: 1,
                acquire_timeout_secs: 5,
                run_migrations: false,
            },
            jwt: JwtConfig {
                secret: "secret".to_string(),
            },
            external_api: ExternalApiConfig {
                enabled: false,
                api_key: String::new(),
            },
            inventory: InventoryConfig {
                low_stock_threshold: Decimal::from(10),
                lot_number_attempts: 5,
            },
            logging: LoggingConfig { json: false },
        }
    }
}
