//! # Lingo Store
//!
//! Pooled persistence for per-user locale preferences.
//!
//! [`PersistenceGateway`] owns one lazily built connection pool and applies
//! a bounded retry policy to transient link failures. [`PreferenceStore`]
//! implements the preference operations on top of it with parameterized
//! statements for MySQL/MariaDB and SQLite.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod dialect;
pub mod error;
pub mod gateway;
pub mod preferences;
pub mod retry;

pub use dialect::{Dialect, DISPLAY_NAME_MAX_CHARS, PREFERENCES_TABLE};
pub use error::{StoreError, StoreResult};
pub use gateway::{PersistenceGateway, PoolStats, ScopedConnection};
pub use preferences::{PreferenceRecord, PreferenceStore};
pub use retry::{classify, FailureKind, RetryDecision, RetryPolicy};
