//! Application wiring: configuration, message catalog and preference store

use crate::error::LingoResult;
use lingo_common::UserId;
use lingo_config::{Config, ConfigError};
use lingo_i18n::{discover, LoadReport, Locale, MessageCatalog};
use lingo_store::{PersistenceGateway, PreferenceStore};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Running Lingo instance
#[derive(Debug)]
pub struct Lingo {
    config: Arc<Config>,
    catalog: Arc<MessageCatalog>,
    gateway: Arc<PersistenceGateway>,
    preferences: PreferenceStore,
}

impl Lingo {
    /// Create a new instance from a validated configuration.
    ///
    /// Nothing is connected or read from disk until [`Lingo::start`].
    pub fn new(config: Config) -> LingoResult<Self> {
        config.validate_all().map_err(ConfigError::from)?;

        let gateway = Arc::new(PersistenceGateway::new(config.database.clone())?);
        let preferences = PreferenceStore::new(Arc::clone(&gateway));

        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(MessageCatalog::new()),
            gateway,
            preferences,
        })
    }

    /// Connect the preference store and load the message catalog
    pub async fn start(&self) -> LingoResult<LoadReport> {
        info!("Starting Lingo...");

        self.start_store().await?;
        let report = self.load_catalog().await?;

        if self.is_ready() {
            info!(generation = report.generation, "Lingo ready");
        } else {
            warn!("Lingo started without any usable locale");
        }
        Ok(report)
    }

    /// Initialize the connection pool and make sure the schema exists
    pub async fn start_store(&self) -> LingoResult<()> {
        if let Err(e) = self.gateway.initialize().await {
            error!(error = %e, backend = %self.config.database.backend, "Preference store unavailable");
            return Err(e.into());
        }
        self.preferences.ensure_schema().await?;
        Ok(())
    }

    /// Discover every catalog file in the configured directory and load them as one batch
    pub async fn load_catalog(&self) -> LingoResult<LoadReport> {
        let catalog = Arc::clone(&self.catalog);
        let directory = self.config.catalog.directory.clone();

        let report = tokio::task::spawn_blocking(move || -> LingoResult<LoadReport> {
            let sources = discover(&directory)?;
            info!(directory = %directory.display(), files = sources.len(), "Loading message catalog");
            Ok(catalog.load(sources))
        })
        .await??;

        log_report(&report);
        Ok(report)
    }

    /// Re-read the sources of the last load
    pub async fn reload(&self) -> LingoResult<LoadReport> {
        let catalog = Arc::clone(&self.catalog);
        let report = tokio::task::spawn_blocking(move || catalog.reload()).await?;
        log_report(&report);
        Ok(report)
    }

    /// Whether at least one locale is loaded and the store answered its last call
    pub fn is_ready(&self) -> bool {
        self.catalog.is_ready() && self.gateway.is_reachable()
    }

    /// Locale stored for `user_id`, or the system default
    pub async fn locale_for(&self, user_id: UserId) -> LingoResult<Locale> {
        Ok(self.preferences.load(user_id).await?)
    }

    /// Store `locale` for `user_id`, creating the row when needed
    pub async fn set_locale(&self, user_id: UserId, locale: Locale) -> LingoResult<()> {
        self.preferences.upsert_locale(user_id, locale).await?;
        info!(%user_id, %locale, "Locale preference saved");
        Ok(())
    }

    /// Message `key` in the locale `user_id` prefers.
    ///
    /// A missing message yields the placeholder text; only store failures
    /// are returned as errors.
    pub async fn message_for(&self, user_id: UserId, key: &str) -> LingoResult<String> {
        let locale = self.locale_for(user_id).await?;
        Ok(self.catalog.get_or_placeholder(locale, key))
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Message catalog
    pub fn catalog(&self) -> &Arc<MessageCatalog> {
        &self.catalog
    }

    /// Persistence gateway
    pub fn gateway(&self) -> &Arc<PersistenceGateway> {
        &self.gateway
    }

    /// Preference store
    pub const fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    /// Close the connection pool
    pub async fn shutdown(&self) {
        info!("Shutting down Lingo...");
        self.gateway.close().await;
    }
}

fn log_report(report: &LoadReport) {
    for (locale, count) in &report.loaded {
        info!(%locale, messages = count, "Locale loaded");
    }
    for (identifier, failure) in &report.failures {
        warn!(source = %identifier, error = %failure, "Catalog source skipped");
    }
}

