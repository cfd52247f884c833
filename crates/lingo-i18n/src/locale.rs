//! Locale registry

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Supported locales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locale {
    /// German (Germany)
    German,
    /// English (United States)
    English,
}

impl Locale {
    /// Locale used when resolution fails or no preference is stored
    pub const SYSTEM_DEFAULT: Self = Self::German;

    const ALL: [Self; 2] = [Self::German, Self::English];

    /// Canonical identifier, e.g. `de_DE`
    pub const fn canonical_id(self) -> &'static str {
        match self {
            Self::German => "de_DE",
            Self::English => "en_US",
        }
    }

    /// Get the display name for this locale
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::German => "Deutsch",
            Self::English => "English",
        }
    }

    /// Get all supported locales
    pub fn all() -> &'static [Self] {
        &Self::ALL
    }

    /// Whether this is the system default locale
    pub fn is_system_default(self) -> bool {
        self == Self::SYSTEM_DEFAULT
    }

    /// Strict lookup: `None` when `identifier` names no supported locale.
    ///
    /// Matching is case-insensitive, ignores surrounding whitespace and a
    /// trailing `.yml`/`.yaml` extension.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let trimmed = strip_extension(identifier.trim());
        Self::ALL
            .into_iter()
            .find(|locale| locale.canonical_id().eq_ignore_ascii_case(trimmed))
    }

    /// Total lookup: unknown identifiers resolve to [`Locale::SYSTEM_DEFAULT`]
    pub fn resolve(identifier: &str) -> Self {
        Self::from_identifier(identifier).unwrap_or(Self::SYSTEM_DEFAULT)
    }
}

fn strip_extension(identifier: &str) -> &str {
    for ext in [".yml", ".yaml"] {
        let Some(cut) = identifier.len().checked_sub(ext.len()).filter(|&cut| cut > 0) else {
            continue;
        };
        if let (Some(stem), Some(tail)) = (identifier.get(..cut), identifier.get(cut..)) {
            if tail.eq_ignore_ascii_case(ext) {
                return stem;
            }
        }
    }
    identifier
}

impl Default for Locale {
    fn default() -> Self {
        Self::SYSTEM_DEFAULT
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_id())
    }
}

/// Error returned by the strict [`FromStr`] implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported locale identifier: {0}")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_identifier(s).ok_or_else(|| UnknownLocale(s.to_string()))
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.canonical_id())
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let identifier = String::deserialize(deserializer)?;
        identifier.parse().map_err(serde::de::Error::custom)
    }
}
