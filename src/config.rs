//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::{FixedRateProvider, Rate};
use crate::engine::RetryPolicy;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Row lock wait limit per unit of work; 0 waits indefinitely
    pub database_lock_timeout_ms: u64,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Units of EUR per 1 USD
    pub usd_eur_rate: Decimal,

    /// Attempts per movement request when the store reports a conflict
    pub movement_max_attempts: u32,

    pub movement_retry_base_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let database_lock_timeout_ms = var("DATABASE_LOCK_TIMEOUT_MS", "0")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_LOCK_TIMEOUT_MS"))?;

        let host = var("HOST", "127.0.0.1");

        let port = var("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = var("ENVIRONMENT", "development");

        let usd_eur_rate: Decimal = var("USD_EUR_RATE", "0.92")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("USD_EUR_RATE"))?;
        if usd_eur_rate <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue("USD_EUR_RATE"));
        }

        let movement_max_attempts = var("MOVEMENT_MAX_ATTEMPTS", "3")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MOVEMENT_MAX_ATTEMPTS"))?;

        let movement_retry_base_delay_ms = var("MOVEMENT_RETRY_BASE_DELAY_MS", "50")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MOVEMENT_RETRY_BASE_DELAY_MS"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            database_lock_timeout_ms,
            host,
            port,
            environment,
            usd_eur_rate,
            movement_max_attempts,
            movement_retry_base_delay_ms,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// The configured USD/EUR rate provider
    pub fn rate_provider(&self) -> Result<FixedRateProvider, ConfigError> {
        let rate = Rate::new(self.usd_eur_rate).map_err(|_| ConfigError::InvalidValue("USD_EUR_RATE"))?;
        Ok(FixedRateProvider::usd_eur(rate))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.movement_max_attempts,
            Duration::from_millis(self.movement_retry_base_delay_ms),
        )
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
