//! Application configuration structures

use lingo_common::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use validator::Validate;

/// Version written into freshly generated configuration files.
///
/// Files carrying an older version are upgraded in place by
/// [`crate::ConfigLoader::load_or_create`].
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Configuration file format version
    #[validate(range(min = 1, message = "Config version must be at least 1"))]
    pub version: u32,

    /// Preference store connectivity
    #[validate]
    pub database: DatabaseConfig,

    /// Message catalog location
    #[validate]
    pub catalog: CatalogConfig,

    /// Logging configuration
    #[validate(custom(function = "crate::validation::validate_logging", message = "Invalid logging configuration"))]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            database: DatabaseConfig::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Comprehensive validation of the entire configuration
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()
    }
}

/// Relational backend the preference store talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// MySQL / MariaDB server
    #[default]
    Mysql,
    /// Embedded SQLite file; `database` is the file path
    Sqlite,
}

impl DatabaseBackend {
    /// Lowercase name as used in configuration files
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown backend name
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown database backend '{0}' (expected 'mysql' or 'sqlite')")]
pub struct UnknownBackend(pub String);

impl FromStr for DatabaseBackend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// Database connectivity configuration
#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "crate::validation::validate_database", skip_on_field_errors = false))]
pub struct DatabaseConfig {
    /// Backend driver
    pub backend: DatabaseBackend,

    /// Server host name (MySQL only)
    pub host: String,

    /// Server port (MySQL only)
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Schema name for MySQL, file path for SQLite
    #[validate(length(min = 1, message = "Database name cannot be empty"))]
    pub database: String,

    /// Login user (MySQL only)
    pub username: String,

    /// Login password (MySQL only)
    pub password: String,

    /// Maximum number of pooled connections
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Upper bound on waiting for a pooled connection, per attempt
    #[validate(range(min = 1, max = 300, message = "Acquire timeout must be between 1 and 300 seconds"))]
    pub acquire_timeout_seconds: u64,

    /// How many times a broken link is tried before giving up
    #[validate(range(min = 1, max = 10, message = "Retry attempts must be between 1 and 10"))]
    pub retry_attempts: u32,

    /// Base delay between attempts; attempt `n` waits `n * retry_backoff_ms`
    #[validate(range(max = 60000, message = "Retry backoff cannot exceed 60000 ms"))]
    pub retry_backoff_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Mysql,
            host: "localhost".to_string(),
            port: 3306,
            database: "lingo".to_string(),
            username: "lingo".to_string(),
            password: String::new(),
            max_connections: 10,
            acquire_timeout_seconds: 5,
            retry_attempts: 3,
            retry_backoff_ms: 250,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_seconds", &self.acquire_timeout_seconds)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl DatabaseConfig {
    /// In-process SQLite configuration pointing at `path`
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: DatabaseBackend::Sqlite,
            host: String::new(),
            database: path.into(),
            ..Self::default()
        }
    }
}

/// Message catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding one `<locale>.yml` file per language
    #[validate(custom(function = "crate::validation::validate_directory", message = "Catalog directory cannot be empty"))]
    pub directory: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("languages"),
        }
    }
}
