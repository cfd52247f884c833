//! Error types for catalog operations

use crate::locale::Locale;
use thiserror::Error;

/// Errors that can occur while loading or querying a message catalog
#[derive(Error, Debug)]
pub enum I18nError {
    /// The locale has no entry in the current snapshot
    #[error("Language not loaded: {locale}")]
    LanguageNotFound {
        /// Requested locale
        locale: Locale,
    },

    /// The locale is loaded but does not define the key
    #[error("Message '{key}' not found for locale {locale}")]
    MessageNotFound {
        /// Requested locale
        locale: Locale,
        /// Requested key
        key: String,
    },

    /// A catalog source could not be read
    #[error("Failed to read catalog source '{identifier}': {source}")]
    SourceRead {
        /// Identifier of the failing source
        identifier: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A catalog source could not be parsed into key/value pairs
    #[error("Failed to parse catalog source '{identifier}': {message}")]
    SourceParse {
        /// Identifier of the failing source
        identifier: String,
        /// Parser diagnostic
        message: String,
    },

    /// A catalog source names no supported locale
    #[error("Catalog source '{identifier}' does not name a supported locale")]
    UnsupportedLocale {
        /// Identifier of the rejected source
        identifier: String,
    },
}

impl I18nError {
    /// Whether this error came from loading a source rather than from a lookup
    pub const fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::SourceRead { .. } | Self::SourceParse { .. } | Self::UnsupportedLocale { .. }
        )
    }
}

/// Result type for i18n operations
pub type I18nResult<T> = Result<T, I18nError>;
