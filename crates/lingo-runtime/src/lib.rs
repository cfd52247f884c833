//! # Lingo Runtime
//!
//! Wires configuration, the message catalog and the preference store into
//! one [`Lingo`] instance, and provides the `lingo` command line tool.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod runtime;

pub use error::{LingoError, LingoResult};
pub use runtime::Lingo;
