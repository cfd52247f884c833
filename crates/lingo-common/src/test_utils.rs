//! Test utilities and shared test helpers for Lingo.
//!
//! This module provides common testing utilities and fixtures that can be used
//! across all crates in the workspace for unit and integration testing.

use crate::UserId;
use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize test logging once per test run.
static INIT: Once = Once::new();

/// Initialize logging for tests with a sensible default configuration.
/// This function is safe to call multiple times and will only initialize once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Create a temporary directory for tests that automatically cleans up.
#[cfg(feature = "tempfile")]
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Deterministic user ids for tests.
pub fn test_user_ids(count: usize) -> Vec<UserId> {
    (0..count)
        .map(|i| UserId(uuid::Uuid::from_u128(0x1000_0000_0000_4000_8000_0000_0000_0000 + i as u128)))
        .collect()
}

/// Catalog fixture YAML documents, keyed by file name.
pub mod catalog_fixtures {
    /// German messages.
    pub fn german_yaml() -> &'static str {
        "greeting: \"Hallo &aWelt\"\nfarewell: \"Tschüss\"\nmenu:\n  title: \"&6Menü\"\n  close: \"Schließen\"\n"
    }

    /// English messages.
    pub fn english_yaml() -> &'static str {
        "greeting: \"Hello &aWorld\"\nfarewell: \"Bye\"\ncount: 3\n"
    }
}
