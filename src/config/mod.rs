//! Configuration management
//!
//! Configuration is loaded from a YAML file (`config.yml` by default) and
//! then overridden by `RECIPE_API_*` environment variables. Missing values
//! are filled with defaults, so an absent or empty file is a valid setup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Start-up gate configuration
    #[serde(default)]
    pub startup: StartupConfig,
    /// Account rules
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// How long a pool waits for a connection before giving up
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Connection acquire timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

fn default_database_url() -> String {
    "data/recipe.db".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Start-up gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConfig {
    /// Run the readiness gate before `serve` connects
    #[serde(default = "default_wait_for_database")]
    pub wait_for_database: bool,
    /// Pause between probe attempts, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Give up after this many attempts (unbounded when absent)
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            wait_for_database: default_wait_for_database(),
            interval_ms: default_interval_ms(),
            max_attempts: None,
        }
    }
}

impl StartupConfig {
    /// Probe interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_wait_for_database() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    1000
}

/// Account rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Minimum accepted password length
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
        }
    }
}

fn default_min_password_length() -> usize {
    5
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides,
    /// then validate the result.
    ///
    /// Environment variables follow the pattern:
    /// - RECIPE_API_SERVER_HOST
    /// - RECIPE_API_SERVER_PORT
    /// - RECIPE_API_SERVER_CORS_ORIGIN
    /// - RECIPE_API_DATABASE_DRIVER
    /// - RECIPE_API_DATABASE_URL
    /// - RECIPE_API_DATABASE_CONNECT_TIMEOUT_SECONDS
    /// - RECIPE_API_STARTUP_WAIT_FOR_DATABASE
    /// - RECIPE_API_STARTUP_INTERVAL_MS
    /// - RECIPE_API_STARTUP_MAX_ATTEMPTS
    /// - RECIPE_API_AUTH_MIN_PASSWORD_LENGTH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse fine but make no sense at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.connect_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "database.connect_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.startup.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "startup.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.startup.max_attempts == Some(0) {
            return Err(ConfigError::ValidationError(
                "startup.max_attempts must be at least 1 when set".to_string(),
            ));
        }
        if self.auth.min_password_length == 0 {
            return Err(ConfigError::ValidationError(
                "auth.min_password_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    /// Values that fail to parse are ignored.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("RECIPE_API_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("RECIPE_API_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("RECIPE_API_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("RECIPE_API_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("RECIPE_API_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(timeout) = env_parse::<u64>("RECIPE_API_DATABASE_CONNECT_TIMEOUT_SECONDS") {
            self.database.connect_timeout_seconds = timeout;
        }

        if let Some(wait) = env_parse::<bool>("RECIPE_API_STARTUP_WAIT_FOR_DATABASE") {
            self.startup.wait_for_database = wait;
        }
        if let Some(interval) = env_parse::<u64>("RECIPE_API_STARTUP_INTERVAL_MS") {
            self.startup.interval_ms = interval;
        }
        if let Some(max) = env_parse::<u32>("RECIPE_API_STARTUP_MAX_ATTEMPTS") {
            self.startup.max_attempts = Some(max);
        }

        if let Some(len) = env_parse::<usize>("RECIPE_API_AUTH_MIN_PASSWORD_LENGTH") {
            self.auth.min_password_length = len;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
