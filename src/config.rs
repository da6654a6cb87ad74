//! Configuration for the exporter.
//!
//! Everything is environment-sourced (via the CLI layer's `env` fallbacks)
//! and read once at startup. A missing weather API key is the only fatal
//! configuration error: the process logs the cause and exits before the
//! scheduler or server ever starts.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

use crate::collector::weather::DEFAULT_REQUEST_TIMEOUT;

/// Default poll interval (20 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Default exposition listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 8000;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A mandatory setting is absent.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A setting is present but invalid.
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Connection parameters for the stats database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "esports".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

/// Weather API parameters.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// API key. Mandatory; never logged in full.
    pub api_key: String,
    /// Polled city name.
    pub city: String,
    /// Current-weather endpoint URL.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            city: "London".to_string(),
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Exposition server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: "0.0.0.0").
    pub bind: String,
    /// Listen port (default: 8000).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_LISTEN_PORT,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub weather: WeatherConfig,
    pub server: ServerConfig,
    /// Interval between collection cycles.
    pub poll_interval: Duration,
}

impl AppConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` for an absent API key and
    /// `ConfigError::Validation` for any invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weather.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("WEATHER_API_KEY"));
        }

        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::Validation(format!("invalid server bind address: '{}'", self.server.bind))
        })?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server port must be non-zero".to_string(),
            ));
        }

        if self.weather.city.trim().is_empty() {
            return Err(ConfigError::Validation(
                "weather city must be non-empty".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(ConfigError::Validation(
                "poll interval must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Mask a secret for logging: first 8 characters, or fully masked when the
/// secret is too short to truncate safely.
pub fn mask_secret(secret: &str) -> String {
    match secret.get(..8) {
        Some(prefix) if secret.len() > 8 => format!("{prefix}..."),
        _ => "***".to_string(),
    }
}
