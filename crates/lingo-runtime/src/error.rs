//! Application-wide error types using thiserror.

use lingo_common::LoggingError;
use lingo_config::ConfigError;
use lingo_i18n::I18nError;
use lingo_store::StoreError;

/// Main runtime error type.
#[derive(thiserror::Error, Debug)]
pub enum LingoError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog error.
    #[error("Catalog error: {0}")]
    I18n(#[from] I18nError),

    /// Preference store error.
    #[error("Preference store error: {0}")]
    Store(#[from] StoreError),

    /// Logging setup error.
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    /// A blocking catalog task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl LingoError {
    /// Whether the error means the preference store is unusable
    pub const fn is_link_failure(&self) -> bool {
        match self {
            Self::Store(err) => err.is_link_failure(),
            _ => false,
        }
    }
}

/// Result type for the runtime.
pub type LingoResult<T> = Result<T, LingoError>;
