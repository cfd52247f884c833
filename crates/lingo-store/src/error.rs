//! Error types for persistence operations

use lingo_common::UserId;
use thiserror::Error;

/// Errors surfaced by the gateway and the preference store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The pool has been closed and can no longer hand out connections
    #[error("Connection to the preference store was lost: {source}")]
    ConnectionLost {
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// Every attempt of the retry budget failed with a transient error
    #[error("Preference store unreachable after {attempts} attempt(s): {source}")]
    LinkExhausted {
        /// Attempts made, equal to the configured budget
        attempts: u32,
        /// Error from the last attempt
        #[source]
        source: sqlx::Error,
    },

    /// `insert` hit an existing row
    #[error("Preference for user {user_id} already exists")]
    DuplicateEntry {
        /// Offending user
        user_id: UserId,
    },

    /// An update matched no row
    #[error("No preference stored for user {user_id}")]
    PreferenceNotFound {
        /// Requested user
        user_id: UserId,
    },

    /// Connectivity settings are missing, malformed or rejected by the server
    #[error("Invalid store configuration: {message}")]
    ConfigurationInvalid {
        /// Description of the problem
        message: String,
    },

    /// Any other database failure, not retried
    #[error("Database error: {source}")]
    Database {
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// Whether the final failure was a bounded wait for a pooled connection running out
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::LinkExhausted {
                source: sqlx::Error::PoolTimedOut,
                ..
            }
        )
    }

    /// Whether the store itself is unusable, as opposed to a failed statement
    pub const fn is_link_failure(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. } | Self::LinkExhausted { .. })
    }

    /// Whether the underlying database rejected a write as a duplicate key
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database {
                source: sqlx::Error::Database(db_err),
            } => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
