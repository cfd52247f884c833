//! Message catalog with lock-free lookups and atomic reload

use crate::error::{I18nError, I18nResult};
use crate::locale::Locale;
use crate::normalize::normalize_text;
use crate::source::{flatten, CatalogSource};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// One immutable generation of the locale → key → text mapping
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    messages: HashMap<Locale, HashMap<String, String>>,
    generation: u64,
}

impl CatalogSnapshot {
    /// Generation number; `0` is the empty startup snapshot
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `locale` has an entry in this snapshot
    pub fn contains_locale(&self, locale: Locale) -> bool {
        self.messages.contains_key(&locale)
    }

    /// Locales present in this snapshot, in registry order
    pub fn locales(&self) -> Vec<Locale> {
        let mut locales: Vec<_> = self.messages.keys().copied().collect();
        locales.sort();
        locales
    }

    /// Strict lookup against this snapshot
    pub fn get(&self, locale: Locale, key: &str) -> I18nResult<&str> {
        let messages = self
            .messages
            .get(&locale)
            .ok_or(I18nError::LanguageNotFound { locale })?;
        messages
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| I18nError::MessageNotFound {
                locale,
                key: key.to_string(),
            })
    }

    /// Number of keys stored for `locale`
    pub fn len(&self, locale: Locale) -> usize {
        self.messages.get(&locale).map_or(0, HashMap::len)
    }

    /// Whether the snapshot holds no locales at all
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Outcome of a [`MessageCatalog::load`] or [`MessageCatalog::reload`]
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Locales published in the new snapshot with their key counts
    pub loaded: Vec<(Locale, usize)>,
    /// Sources that contributed nothing, with the reason
    pub failures: Vec<(String, I18nError)>,
    /// Generation of the published snapshot
    pub generation: u64,
}

impl LoadReport {
    /// Whether every source loaded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Placeholder returned by lenient lookups
pub fn placeholder(locale: Locale, key: &str) -> String {
    format!("message not set up for key={key} locale={}", locale.canonical_id())
}

/// Holds the current catalog snapshot and the batch of sources it was built from.
///
/// Readers go through [`ArcSwap`] and never block; loads are serialized by
/// the mutex around the retained batch and publish only a fully built
/// snapshot.
pub struct MessageCatalog {
    current: ArcSwap<CatalogSnapshot>,
    sources: Mutex<Vec<Arc<dyn CatalogSource>>>,
}

impl std::fmt::Debug for MessageCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.current.load();
        f.debug_struct("MessageCatalog")
            .field("generation", &snapshot.generation)
            .field("locales", &snapshot.locales())
            .finish_non_exhaustive()
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(CatalogSnapshot::default()),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Build a snapshot from `sources`, publish it and retain the batch for [`reload`](Self::reload).
    ///
    /// A failing source is reported and left out; it does not stop the
    /// others from loading.
    pub fn load(&self, sources: Vec<Arc<dyn CatalogSource>>) -> LoadReport {
        let mut retained = self.sources.lock();
        *retained = sources;
        self.rebuild(&retained)
    }

    /// Re-read the retained batch and publish the result
    pub fn reload(&self) -> LoadReport {
        let retained = self.sources.lock();
        debug!(sources = retained.len(), "Reloading message catalog");
        self.rebuild(&retained)
    }

    fn rebuild(&self, sources: &[Arc<dyn CatalogSource>]) -> LoadReport {
        let generation = self.current.load().generation + 1;
        let mut messages: HashMap<Locale, HashMap<String, String>> = HashMap::new();
        let mut report = LoadReport {
            generation,
            ..LoadReport::default()
        };

        for source in sources {
            let identifier = source.identifier();
            match read_source(source.as_ref()) {
                Ok((locale, entries)) => {
                    if messages.insert(locale, entries).is_some() {
                        warn!(source = identifier, %locale, "Locale supplied twice, later source wins");
                    }
                }
                Err(e) => {
                    warn!(source = identifier, error = %e, "Failed to load catalog source");
                    report.failures.push((identifier.to_string(), e));
                }
            }
        }

        report.loaded = messages.iter().map(|(locale, keys)| (*locale, keys.len())).collect();
        report.loaded.sort();

        self.current.store(Arc::new(CatalogSnapshot { messages, generation }));
        info!(
            generation,
            locales = report.loaded.len(),
            failures = report.failures.len(),
            "Published message catalog"
        );
        report
    }

    /// Current snapshot; stays valid and unchanged even if a reload happens meanwhile
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.load_full()
    }

    /// Generation of the current snapshot
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Strict lookup.
    ///
    /// Fails with [`I18nError::LanguageNotFound`] if `locale` was never loaded
    /// and with [`I18nError::MessageNotFound`] if the key is missing.
    pub fn get(&self, locale: Locale, key: &str) -> I18nResult<String> {
        self.current.load().get(locale, key).map(str::to_owned)
    }

    /// Lenient lookup: any failure yields the [`placeholder`] text
    pub fn get_or_placeholder(&self, locale: Locale, key: &str) -> String {
        match self.get(locale, key) {
            Ok(text) => text,
            Err(e) => {
                warn!(%locale, key, error = %e, "Unresolved message");
                placeholder(locale, key)
            }
        }
    }

    /// Whether `key` resolves for `locale`
    pub fn has_message(&self, locale: Locale, key: &str) -> bool {
        self.current.load().get(locale, key).is_ok()
    }

    /// Locales in the current snapshot
    pub fn loaded_locales(&self) -> Vec<Locale> {
        self.current.load().locales()
    }

    /// Sorted keys for `locale`, or `LanguageNotFound`
    pub fn keys(&self, locale: Locale) -> I18nResult<Vec<String>> {
        let snapshot = self.current.load();
        let messages = snapshot
            .messages
            .get(&locale)
            .ok_or(I18nError::LanguageNotFound { locale })?;
        let mut keys: Vec<_> = messages.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// True once a load has published at least one locale
    pub fn is_ready(&self) -> bool {
        !self.current.load().is_empty()
    }
}

fn read_source(source: &dyn CatalogSource) -> I18nResult<(Locale, HashMap<String, String>)> {
    let identifier = source.identifier();
    let locale = Locale::from_identifier(identifier).ok_or_else(|| I18nError::UnsupportedLocale {
        identifier: identifier.to_string(),
    })?;

    let raw = source.read()?;
    let entries = flatten(identifier, &raw)?
        .into_iter()
        .map(|(key, text)| {
            let text = normalize_text(&text);
            trace!(%locale, key = %key, text = %text, "Catalog entry");
            (key, text)
        })
        .collect::<HashMap<_, _>>();

    debug!(%locale, keys = entries.len(), "Loaded catalog source");
    Ok((locale, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn source(id: &str, pairs: &[(&str, &str)]) -> Arc<dyn CatalogSource> {
        Arc::new(MemorySource::from_pairs(id, pairs.iter().copied()))
    }

    struct FailingSource;

    impl CatalogSource for FailingSource {
        fn identifier(&self) -> &str {
            "en_US"
        }

        fn read(&self) -> I18nResult<crate::source::RawMessages> {
            Err(I18nError::SourceRead {
                identifier: "en_US".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            })
        }
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = MessageCatalog::new();
        assert!(!catalog.is_ready());
        assert_eq!(catalog.generation(), 0);
        assert!(matches!(
            catalog.get(Locale::German, "greeting"),
            Err(I18nError::LanguageNotFound { locale: Locale::German })
        ));
    }

    #[test]
    fn test_load_and_get_normalized() {
        let catalog = MessageCatalog::new();
        let report = catalog.load(vec![source("de_DE", &[("greeting", "Hallo &aWelt")])]);

        assert!(report.is_complete());
        assert_eq!(report.loaded, vec![(Locale::German, 1)]);
        assert_eq!(catalog.get(Locale::German, "greeting").unwrap(), "Hallo §aWelt");
        assert!(catalog.is_ready());
    }

    #[test]
    fn test_missing_key_and_language() {
        let catalog = MessageCatalog::new();
        catalog.load(vec![source("de_DE", &[("greeting", "Hallo")])]);

        assert!(matches!(
            catalog.get(Locale::German, "missing"),
            Err(I18nError::MessageNotFound { .. })
        ));
        assert!(matches!(
            catalog.get(Locale::English, "greeting"),
            Err(I18nError::LanguageNotFound { locale: Locale::English })
        ));
    }

    #[test]
    fn test_placeholder() {
        let catalog = MessageCatalog::new();
        catalog.load(vec![source("de_DE", &[("greeting", "Hallo")])]);

        assert_eq!(
            catalog.get_or_placeholder(Locale::German, "missing"),
            "message not set up for key=missing locale=de_DE"
        );
        assert_eq!(
            catalog.get_or_placeholder(Locale::English, "greeting"),
            "message not set up for key=greeting locale=en_US"
        );
        assert_eq!(catalog.get_or_placeholder(Locale::German, "greeting"), "Hallo");
    }

    #[test]
    fn test_failing_source_is_isolated() {
        let catalog = MessageCatalog::new();
        let report = catalog.load(vec![
            source("de_DE", &[("greeting", "Hallo")]),
            Arc::new(FailingSource),
            source("fr_FR", &[("greeting", "Bonjour")]),
        ]);

        assert_eq!(report.loaded, vec![(Locale::German, 1)]);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|(_, e)| e.is_load_failure()));
        assert!(matches!(report.failures[1].1, I18nError::UnsupportedLocale { .. }));
        assert!(!catalog.snapshot().contains_locale(Locale::English));
    }

    #[test]
    fn test_failed_locale_does_not_keep_old_data() {
        let catalog = MessageCatalog::new();
        catalog.load(vec![source("en_US", &[("greeting", "Hello")])]);
        assert!(catalog.has_message(Locale::English, "greeting"));

        catalog.load(vec![Arc::new(FailingSource)]);
        assert!(matches!(
            catalog.get(Locale::English, "greeting"),
            Err(I18nError::LanguageNotFound { .. })
        ));
    }

    #[test]
    fn test_reload_replaces_content() {
        let catalog = MessageCatalog::new();
        catalog.load(vec![source("en_US", &[("old", "Old"), ("shared", "One")])]);
        catalog.load(vec![source("en_US", &[("shared", "Two"), ("new", "New")])]);

        assert!(!catalog.has_message(Locale::English, "old"));
        assert_eq!(catalog.get(Locale::English, "shared").unwrap(), "Two");
        assert_eq!(catalog.keys(Locale::English).unwrap(), vec!["new", "shared"]);
        assert_eq!(catalog.generation(), 2);
    }

    #[test]
    fn test_reload_rereads_retained_batch() {
        let catalog = MessageCatalog::new();
        catalog.load(vec![source("en_US", &[("greeting", "Hello")])]);
        let report = catalog.reload();

        assert_eq!(report.generation, 2);
        assert_eq!(catalog.get(Locale::English, "greeting").unwrap(), "Hello");
    }

    #[test]
    fn test_snapshot_is_stable_across_reload() {
        let catalog = MessageCatalog::new();
        catalog.load(vec![source("en_US", &[("greeting", "Hello")])]);
        let before = catalog.snapshot();

        catalog.load(vec![source("en_US", &[("greeting", "Howdy")])]);

        assert_eq!(before.get(Locale::English, "greeting").unwrap(), "Hello");
        assert_eq!(catalog.get(Locale::English, "greeting").unwrap(), "Howdy");
    }

    #[test]
    fn test_load_with_empty_batch_is_not_ready() {
        let catalog = MessageCatalog::new();
        let report = catalog.load(Vec::new());
        assert!(report.loaded.is_empty());
        assert!(!catalog.is_ready());
    }
}
