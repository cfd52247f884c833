//! Validation utilities and regex patterns

use crate::settings::{DatabaseBackend, DatabaseConfig};
use lingo_common::LoggingConfig;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use validator::ValidationError;

/// Regex for a tracing target in a filter directive (e.g. `lingo_store`, `sqlx::query`)
pub static LOG_TARGET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").expect("Invalid log target regex pattern")
});

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Validate a log filter: comma separated `level` or `target=level` directives
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if level.trim().is_empty() {
        return Err(ValidationError::new("empty_log_level"));
    }

    for directive in level.split(',').map(str::trim) {
        let (target, lvl) = match directive.split_once('=') {
            Some((target, lvl)) => (Some(target.trim()), lvl.trim()),
            None => (None, directive),
        };

        if !LOG_LEVELS.contains(&lvl.to_ascii_lowercase().as_str()) {
            return Err(ValidationError::new("invalid_log_level"));
        }
        if let Some(target) = target {
            if !LOG_TARGET_REGEX.is_match(target) {
                return Err(ValidationError::new("invalid_log_target"));
            }
        }
    }

    Ok(())
}

/// Validate the logging section
pub fn validate_logging(logging: &LoggingConfig) -> Result<(), ValidationError> {
    validate_log_level(&logging.level)?;
    if logging.directory.is_some() && logging.file_prefix.trim().is_empty() {
        return Err(ValidationError::new("empty_log_file_prefix"));
    }
    Ok(())
}

/// Validate a configured directory path
pub fn validate_directory(path: &PathBuf) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::new("empty_directory"));
    }
    Ok(())
}

/// Cross-field checks that depend on the selected backend
pub fn validate_database(config: &DatabaseConfig) -> Result<(), ValidationError> {
    match config.backend {
        DatabaseBackend::Mysql => {
            if config.host.trim().is_empty() {
                let mut err = ValidationError::new("missing_host");
                err.message = Some("MySQL backend requires a host".into());
                return Err(err);
            }
            if config.host.contains(['/', '@', ' ']) {
                let mut err = ValidationError::new("invalid_host");
                err.message = Some("Host must be a bare host name or address".into());
                return Err(err);
            }
            if config.username.trim().is_empty() {
                let mut err = ValidationError::new("missing_username");
                err.message = Some("MySQL backend requires a username".into());
                return Err(err);
            }
        }
        DatabaseBackend::Sqlite => {}
    }
    Ok(())
}
