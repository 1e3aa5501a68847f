//! Configuration management.
//!
//! Values are resolved in three layers: built-in defaults, an optional TOML
//! file, then environment variables (a `.env` file is loaded first if present).

use crate::storage::{PostgresExpenseStorage, StorageBackendType, is_valid_table_name};
use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 2565;

/// Default table name for expenses.
pub const DEFAULT_TABLE_NAME: &str = "expenses";

/// Main configuration for outlay.
#[derive(Debug, Clone)]
pub struct OutlayConfig {
    /// Port the HTTP server listens on.
    pub port: u16,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Expected `Authorization` header value. `None` disables the check.
    pub auth_key: Option<String>,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Which backend holds the expenses.
    pub backend: StorageBackendType,
    /// Table name used by the PostgreSQL backend.
    pub table_name: String,
    /// Maximum pooled PostgreSQL connections.
    pub pool_max_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Postgres,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            pool_max_size: PostgresExpenseStorage::DEFAULT_POOL_MAX_SIZE,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// Output format: "json" or "pretty".
    pub format: Option<String>,
    /// `EnvFilter` directive, e.g. "info,outlay=debug".
    pub filter: Option<String>,
}

/// Metrics section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is installed.
    pub enabled: Option<bool>,
    /// Port of the Prometheus scrape listener.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// HTTP port.
    pub port: Option<u16>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Authorization key.
    pub auth_key: Option<String>,
    /// Storage section.
    pub storage: Option<ConfigFileStorage>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

/// Storage section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStorage {
    /// Backend name: "postgres" or "memory".
    pub backend: Option<String>,
    /// Table name.
    pub table_name: Option<String>,
    /// Pool size.
    pub pool_max_size: Option<usize>,
}

impl Default for OutlayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            auth_key: None,
            storage: StorageConfig::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl OutlayConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration for the process.
    ///
    /// Uses `path` when given, otherwise the default config file if one
    /// exists, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Self::from_config_file(file)
    }

    /// Platform config location, e.g. `~/.config/outlay/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("outlay").join("config.toml"))
    }

    /// Converts a `ConfigFile` to `OutlayConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = file.port {
            config.port = port;
        }
        config.database_url = file.database_url;
        config.auth_key = file.auth_key;
        if let Some(storage) = file.storage {
            if let Some(backend) = storage.backend {
                config.storage.backend = backend.parse()?;
            }
            if let Some(table_name) = storage.table_name {
                config.storage.table_name = table_name;
            }
            if let Some(size) = storage.pool_max_size {
                config.storage.pool_max_size = size;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.port = parse_env("PORT", &port)?;
        }
        if let Some(url) = get("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(key) = get("AUTH_KEY") {
            self.auth_key = Some(key);
        }
        if let Some(backend) = get("OUTLAY_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(table) = get("OUTLAY_TABLE_NAME") {
            self.storage.table_name = table;
        }
        if let Some(size) = get("OUTLAY_POOL_MAX_SIZE") {
            self.storage.pool_max_size = parse_env("OUTLAY_POOL_MAX_SIZE", &size)?;
        }
        if let Some(format) = get("OUTLAY_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(filter) = get("RUST_LOG") {
            self.logging.filter = Some(filter);
        }
        if let Some(enabled) = get("OUTLAY_METRICS_ENABLED") {
            self.metrics.enabled = Some(parse_bool("OUTLAY_METRICS_ENABLED", &enabled)?);
        }
        if let Some(port) = get("OUTLAY_METRICS_PORT") {
            self.metrics.port = Some(parse_env("OUTLAY_METRICS_PORT", &port)?);
        }

        Ok(())
    }

    /// Checks the values the selected backend needs.
    pub fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageBackendType::Postgres {
            if self.database_url.is_none() {
                return Err(Error::InvalidInput(
                    "missing required configuration: DATABASE_URL".to_string(),
                ));
            }
            if !is_valid_table_name(&self.storage.table_name) {
                return Err(Error::InvalidInput(format!(
                    "table name '{}' is not a plain SQL identifier",
                    self.storage.table_name
                )));
            }
        }
        if self.storage.pool_max_size == 0 {
            return Err(Error::InvalidInput(
                "pool_max_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the storage backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: StorageBackendType) -> Self {
        self.storage.backend = backend;
        self
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::InvalidInput(format!("{key}={value}: {e}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!("{key}={value}: expected a boolean"))),
    }
}

/// Hides the password component of a connection URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}

impl fmt::Display for OutlayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "port = {}", self.port)?;
        writeln!(
            f,
            "database_url = {}",
            self.database_url.as_deref().map_or_else(|| "(unset)".to_string(), redact_url)
        )?;
        writeln!(
            f,
            "auth_key = {}",
            if self.auth_key.is_some() { "***" } else { "(unset)" }
        )?;
        writeln!(f, "storage.backend = {}", self.storage.backend)?;
        writeln!(f, "storage.table_name = {}", self.storage.table_name)?;
        writeln!(f, "storage.pool_max_size = {}", self.storage.pool_max_size)?;
        writeln!(
            f,
            "logging.format = {}",
            self.logging.format.as_deref().unwrap_or("json")
        )?;
        writeln!(
            f,
            "logging.filter = {}",
            self.logging.filter.as_deref().unwrap_or("info")
        )?;
        writeln!(
            f,
            "metrics.enabled = {}",
            self.metrics.enabled.unwrap_or(false)
        )?;
        write!(
            f,
            "metrics.port = {}",
            self.metrics
                .port
                .unwrap_or(crate::observability::DEFAULT_METRICS_PORT)
        )
    }
}
