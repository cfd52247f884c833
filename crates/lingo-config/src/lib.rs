//! # Lingo Config
//!
//! Type-safe configuration loading and validation for Lingo.
//!
//! Configuration is read from YAML, overlaid with `LINGO_*` environment
//! variables, and validated before it is handed to the runtime.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod loader;
pub mod settings;
pub mod validation;

pub use loader::{ConfigError, ConfigLoader, CONFIG_PATH_ENV};
pub use settings::{CatalogConfig, Config, DatabaseBackend, DatabaseConfig, UnknownBackend, CURRENT_CONFIG_VERSION};
