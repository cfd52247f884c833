//! # Lingo I18n
//!
//! Locale registry and message catalogs for Lingo.
//!
//! This crate provides:
//!
//! - The closed set of supported [`Locale`]s and total identifier resolution
//! - [`CatalogSource`]s that supply raw per-locale key/value data
//! - A [`MessageCatalog`] whose lookups never block and whose reloads are atomic
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lingo_i18n::{CatalogSource, Locale, MemorySource, MessageCatalog};
//!
//! let catalog = MessageCatalog::new();
//! let german: Arc<dyn CatalogSource> =
//!     Arc::new(MemorySource::from_pairs("de_DE", [("greeting", "Hallo &aWelt")]));
//! catalog.load(vec![german]);
//!
//! assert_eq!(catalog.get(Locale::German, "greeting").unwrap(), "Hallo §aWelt");
//! assert_eq!(
//!     catalog.get_or_placeholder(Locale::English, "greeting"),
//!     "message not set up for key=greeting locale=en_US"
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod error;
pub mod locale;
pub mod normalize;
pub mod source;

pub use catalog::{placeholder, CatalogSnapshot, LoadReport, MessageCatalog};
pub use error::{I18nError, I18nResult};
pub use locale::{Locale, UnknownLocale};
pub use normalize::normalize_text;
pub use source::{discover, CatalogSource, MemorySource, RawMessages, YamlFileSource};
