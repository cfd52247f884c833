//! Configuration loading utilities

use crate::settings::{Config, CURRENT_CONFIG_VERSION};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "LINGO_CONFIG_PATH";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading or writing the configuration file
    #[error("Failed to access configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {source}")]
    EnvParse {
        /// Offending variable
        var: String,
        /// Underlying parse failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file with environment variable overrides
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::parse_str(&content)?;

        Self::apply_overrides(&mut config, |var| env::var(var).ok())?;
        config.validate_all()?;

        debug!(path = %path.as_ref().display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from `LINGO_CONFIG_PATH`, `lingo.yaml`, `lingo.yml`, or defaults
    pub fn load() -> Result<Config, ConfigError> {
        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            return Self::load_config(config_path);
        }

        for candidate in ["lingo.yaml", "lingo.yml"] {
            if Path::new(candidate).exists() {
                return Self::load_config(candidate);
            }
        }

        info!("No configuration file found, using defaults");
        let mut config = Config::default();
        Self::apply_overrides(&mut config, |var| env::var(var).ok())?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load `path`, writing a default file first when it does not exist.
    ///
    /// A file whose `version` is older than [`CURRENT_CONFIG_VERSION`] is
    /// rewritten with the current version and any new keys filled in.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "Writing default configuration");
            Self::save(path, &Config::default())?;
        } else {
            let content = std::fs::read_to_string(path)?;
            let mut config = Self::parse_str(&content)?;
            if config.version < CURRENT_CONFIG_VERSION {
                warn!(
                    path = %path.display(),
                    from = config.version,
                    to = CURRENT_CONFIG_VERSION,
                    "Upgrading configuration file"
                );
                config.version = CURRENT_CONFIG_VERSION;
                Self::save(path, &config)?;
            }
        }

        Self::load_config(path)
    }

    /// Parse YAML text into a configuration, filling in defaults for missing keys
    pub fn parse_str(content: &str) -> Result<Config, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Write a configuration file, replacing the target only once fully written
    pub fn save<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(config)?;
        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        std::fs::write(&staging, yaml)?;
        std::fs::rename(&staging, path)?;
        Ok(())
    }

    /// Apply overrides read through `lookup` (normally the process environment)
    pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut config.database;

        if let Some(backend) = lookup("LINGO_DB_BACKEND") {
            db.backend = parse_var("LINGO_DB_BACKEND", &backend)?;
        }
        if let Some(host) = lookup("LINGO_DB_HOST") {
            db.host = host;
        }
        if let Some(port) = lookup("LINGO_DB_PORT") {
            db.port = parse_var("LINGO_DB_PORT", &port)?;
        }
        if let Some(name) = lookup("LINGO_DB_NAME") {
            db.database = name;
        }
        if let Some(user) = lookup("LINGO_DB_USER") {
            db.username = user;
        }
        if let Some(password) = lookup("LINGO_DB_PASSWORD") {
            db.password = password;
        }
        if let Some(max) = lookup("LINGO_DB_MAX_CONNECTIONS") {
            db.max_connections = parse_var("LINGO_DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(timeout) = lookup("LINGO_DB_ACQUIRE_TIMEOUT") {
            db.acquire_timeout_seconds = parse_var("LINGO_DB_ACQUIRE_TIMEOUT", &timeout)?;
        }
        if let Some(attempts) = lookup("LINGO_DB_RETRY_ATTEMPTS") {
            db.retry_attempts = parse_var("LINGO_DB_RETRY_ATTEMPTS", &attempts)?;
        }

        if let Some(dir) = lookup("LINGO_CATALOG_DIR") {
            config.catalog.directory = PathBuf::from(dir);
        }

        if let Some(level) = lookup("LINGO_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(())
    }
}

fn parse_var<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse().map_err(|e| ConfigError::EnvParse {
        var: var.to_string(),
        source: Box::new(e),
    })
}
