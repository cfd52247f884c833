//! Backend-specific connection URLs and SQL

use crate::error::{StoreError, StoreResult};
use lingo_config::{DatabaseBackend, DatabaseConfig};
use url::Url;

macro_rules! preferences_table {
    () => {
        "lingo_preferences"
    };
}
pub(crate) use preferences_table;

/// Name of the table holding per-user preferences
pub const PREFERENCES_TABLE: &str = preferences_table!();

/// Longest display name the schema accepts, in characters
pub const DISPLAY_NAME_MAX_CHARS: usize = 32;

/// SQL dialect of the configured backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// MySQL / MariaDB
    MySql,
    /// SQLite
    Sqlite,
}

impl Dialect {
    /// Dialect for a configured backend
    pub const fn for_backend(backend: DatabaseBackend) -> Self {
        match backend {
            DatabaseBackend::Mysql => Self::MySql,
            DatabaseBackend::Sqlite => Self::Sqlite,
        }
    }

    /// Connection URL for `config`, with credentials percent-encoded
    pub fn connection_url(self, config: &DatabaseConfig) -> StoreResult<String> {
        match self {
            Self::MySql => {
                let invalid = |what: &str| StoreError::ConfigurationInvalid {
                    message: format!("cannot use {what} in a MySQL connection URL"),
                };

                let mut url = Url::parse("mysql://localhost").map_err(|e| StoreError::ConfigurationInvalid {
                    message: e.to_string(),
                })?;
                url.set_host(Some(&config.host)).map_err(|_| invalid("the configured host"))?;
                url.set_port(Some(config.port)).map_err(|()| invalid("the configured port"))?;
                url.set_username(&config.username)
                    .map_err(|()| invalid("the configured username"))?;
                if !config.password.is_empty() {
                    url.set_password(Some(&config.password))
                        .map_err(|()| invalid("the configured password"))?;
                }
                url.set_path(&config.database);
                Ok(url.into())
            }
            Self::Sqlite => {
                if config.database.trim().is_empty() {
                    return Err(StoreError::ConfigurationInvalid {
                        message: "SQLite backend requires a database file path".to_string(),
                    });
                }
                Ok(format!("sqlite://{}?mode=rwc", config.database))
            }
        }
    }

    /// Idempotent table creation
    pub const fn create_table(self) -> &'static str {
        match self {
            Self::MySql => concat!(
                "CREATE TABLE IF NOT EXISTS ",
                preferences_table!(),
                " (user_id VARCHAR(36) NOT NULL PRIMARY KEY,",
                " display_name VARCHAR(32) NULL,",
                " locale VARCHAR(8) NULL,",
                " created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
                " DEFAULT CHARSET = utf8mb4"
            ),
            Self::Sqlite => concat!(
                "CREATE TABLE IF NOT EXISTS ",
                preferences_table!(),
                " (user_id VARCHAR(36) NOT NULL PRIMARY KEY,",
                " display_name VARCHAR(32) NULL,",
                " locale VARCHAR(8) NULL,",
                " created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)"
            ),
        }
    }

    /// Atomic create-or-update of the locale column; binds `user_id`, `locale`
    pub const fn upsert_locale(self) -> &'static str {
        match self {
            Self::MySql => concat!(
                "INSERT INTO ",
                preferences_table!(),
                " (user_id, locale, created_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
                " ON DUPLICATE KEY UPDATE locale = VALUES(locale)"
            ),
            Self::Sqlite => concat!(
                "INSERT INTO ",
                preferences_table!(),
                " (user_id, locale, created_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
                " ON CONFLICT(user_id) DO UPDATE SET locale = excluded.locale"
            ),
        }
    }
}
