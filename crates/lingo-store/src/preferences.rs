//! Per-user locale preferences
//!
//! Every call takes its own scoped connection from the gateway and returns
//! it before completing; nothing is cached between calls. Writes for the same
//! user issued concurrently are not ordered: the last one committed wins.

use crate::dialect::{preferences_table, Dialect, DISPLAY_NAME_MAX_CHARS};
use crate::error::{StoreError, StoreResult};
use crate::gateway::PersistenceGateway;
use chrono::{DateTime, NaiveDateTime, Utc};
use lingo_common::{truncate_chars, UserId};
use lingo_i18n::Locale;
use sqlx::any::AnyRow;
use sqlx::{ColumnIndex, Row, ValueRef};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SELECT_LOCALE: &str = concat!("SELECT locale FROM ", preferences_table!(), " WHERE user_id = ?");
const SELECT_EXISTS: &str = concat!("SELECT 1 FROM ", preferences_table!(), " WHERE user_id = ?");
const SELECT_RECORD: &str = concat!(
    "SELECT user_id, display_name, locale, CAST(created_at AS CHAR) AS created_at FROM ",
    preferences_table!(),
    " WHERE user_id = ?"
);
const INSERT_DEFAULT: &str = concat!(
    "INSERT INTO ",
    preferences_table!(),
    " (user_id, locale, created_at) VALUES (?, ?, CURRENT_TIMESTAMP)"
);
const UPDATE_LOCALE: &str = concat!("UPDATE ", preferences_table!(), " SET locale = ? WHERE user_id = ?");
const UPDATE_DISPLAY_NAME: &str = concat!(
    "UPDATE ",
    preferences_table!(),
    " SET display_name = ? WHERE user_id = ?"
);

/// One stored preference row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceRecord {
    /// Owner of the row
    pub user_id: UserId,
    /// Optional display name, at most 32 characters
    pub display_name: Option<String>,
    /// Stored locale identifier, exactly as persisted
    pub locale_id: Option<String>,
    /// Row creation time (UTC)
    pub created_at: DateTime<Utc>,
}

impl PreferenceRecord {
    /// Effective locale; missing or unrecognized identifiers resolve to the system default
    pub fn locale(&self) -> Locale {
        self.locale_id.as_deref().map_or(Locale::SYSTEM_DEFAULT, Locale::resolve)
    }
}

/// Locale preferences stored through a [`PersistenceGateway`]
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    gateway: Arc<PersistenceGateway>,
}

impl PreferenceStore {
    /// Create a store on top of `gateway`
    pub const fn new(gateway: Arc<PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// Gateway used by this store
    pub fn gateway(&self) -> &Arc<PersistenceGateway> {
        &self.gateway
    }

    /// Create the preferences table if it does not exist
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        let statement = self.gateway.dialect().create_table();
        self.gateway
            .with_connection("ensure_schema", |conn| {
                Box::pin(async move { sqlx::query(statement).execute(conn).await.map(|_| ()) })
            })
            .await?;
        info!("Preference schema ready");
        Ok(())
    }

    /// Stored locale for `user_id`.
    ///
    /// A user without a row gets [`Locale::SYSTEM_DEFAULT`] and no row is
    /// created. A stored identifier that is no longer supported also
    /// resolves to the default instead of failing.
    pub async fn load(&self, user_id: UserId) -> StoreResult<Locale> {
        let key = user_id.to_storage_key();
        let stored: Option<Option<String>> = self
            .gateway
            .with_connection("load", |conn| {
                let key = key.clone();
                Box::pin(async move {
                    let row = sqlx::query(SELECT_LOCALE).bind(key).fetch_optional(conn).await?;
                    row.map(|row| optional_text(&row, 0)).transpose()
                })
            })
            .await?;

        let locale = match stored {
            None => {
                debug!(%user_id, "No stored preference, using system default");
                Locale::SYSTEM_DEFAULT
            }
            Some(None) => Locale::SYSTEM_DEFAULT,
            Some(Some(identifier)) => Locale::from_identifier(&identifier).unwrap_or_else(|| {
                warn!(%user_id, stored = %identifier, "Unrecognized stored locale, using system default");
                Locale::resolve(&identifier)
            }),
        };
        Ok(locale)
    }

    /// Whether a row exists for `user_id`
    pub async fn exists(&self, user_id: UserId) -> StoreResult<bool> {
        let key = user_id.to_storage_key();
        self.gateway
            .with_connection("exists", |conn| {
                let key = key.clone();
                Box::pin(async move {
                    let row = sqlx::query(SELECT_EXISTS).bind(key).fetch_optional(conn).await?;
                    Ok(row.is_some())
                })
            })
            .await
    }

    /// Create a row with the system default locale.
    ///
    /// Fails with [`StoreError::DuplicateEntry`] if the user already has one.
    pub async fn insert(&self, user_id: UserId) -> StoreResult<()> {
        let key = user_id.to_storage_key();
        self.gateway
            .with_connection("insert", |conn| {
                let key = key.clone();
                Box::pin(async move {
                    sqlx::query(INSERT_DEFAULT)
                        .bind(key)
                        .bind(Locale::SYSTEM_DEFAULT.canonical_id())
                        .execute(conn)
                        .await
                        .map(|_| ())
                })
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    StoreError::DuplicateEntry { user_id }
                } else {
                    e
                }
            })?;

        debug!(%user_id, "Inserted preference row");
        Ok(())
    }

    /// Update the locale of an existing row.
    ///
    /// Fails with [`StoreError::PreferenceNotFound`] if the user has no row.
    pub async fn set_locale(&self, user_id: UserId, locale: Locale) -> StoreResult<()> {
        self.update_column("set_locale", UPDATE_LOCALE, user_id, Some(locale.canonical_id().to_string()))
            .await?;
        debug!(%user_id, %locale, "Updated locale");
        Ok(())
    }

    /// Create the row or update its locale in one atomic statement
    pub async fn upsert_locale(&self, user_id: UserId, locale: Locale) -> StoreResult<()> {
        let statement = self.gateway.dialect().upsert_locale();
        let key = user_id.to_storage_key();
        self.gateway
            .with_connection("upsert_locale", |conn| {
                let key = key.clone();
                Box::pin(async move {
                    sqlx::query(statement)
                        .bind(key)
                        .bind(locale.canonical_id())
                        .execute(conn)
                        .await
                        .map(|_| ())
                })
            })
            .await?;
        debug!(%user_id, %locale, "Upserted locale");
        Ok(())
    }

    /// Set or clear the display name, truncated to the column width
    pub async fn set_display_name(&self, user_id: UserId, name: Option<&str>) -> StoreResult<()> {
        let name = name.map(|n| truncate_chars(n.trim(), DISPLAY_NAME_MAX_CHARS).to_string());
        self.update_column("set_display_name", UPDATE_DISPLAY_NAME, user_id, name)
            .await
    }

    /// Full row for `user_id`, if any
    pub async fn record(&self, user_id: UserId) -> StoreResult<Option<PreferenceRecord>> {
        let key = user_id.to_storage_key();
        let row = self
            .gateway
            .with_connection("record", |conn| {
                let key = key.clone();
                Box::pin(async move {
                    let row = sqlx::query(SELECT_RECORD).bind(key).fetch_optional(conn).await?;
                    row.map(|row| decode_record(&row)).transpose()
                })
            })
            .await?;
        Ok(row)
    }

    async fn update_column(
        &self,
        operation: &str,
        statement: &'static str,
        user_id: UserId,
        value: Option<String>,
    ) -> StoreResult<()> {
        let key = user_id.to_storage_key();
        let matched = self
            .gateway
            .with_connection(operation, |conn| {
                let key = key.clone();
                let value = value.clone();
                Box::pin(async move {
                    let result = sqlx::query(statement)
                        .bind(value)
                        .bind(key.clone())
                        .execute(&mut *conn)
                        .await?;
                    if result.rows_affected() > 0 {
                        return Ok(true);
                    }
                    // Some servers report only changed rows; an unchanged value still matched.
                    let row = sqlx::query(SELECT_EXISTS).bind(key).fetch_optional(&mut *conn).await?;
                    Ok(row.is_some())
                })
            })
            .await?;

        if matched {
            Ok(())
        } else {
            Err(StoreError::PreferenceNotFound { user_id })
        }
    }

    /// Dialect of the underlying gateway
    pub fn dialect(&self) -> Dialect {
        self.gateway.dialect()
    }
}

fn decode_record(row: &AnyRow) -> Result<PreferenceRecord, sqlx::Error> {
    let raw_id: String = row.try_get("user_id")?;
    let user_id = raw_id.parse::<UserId>().map_err(|e| sqlx::Error::ColumnDecode {
        index: "user_id".to_string(),
        source: Box::new(e),
    })?;

    let created_raw: String = row.try_get("created_at")?;
    let created_at = parse_timestamp(&created_raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: "created_at".to_string(),
        source: Box::new(e),
    })?;

    Ok(PreferenceRecord {
        user_id,
        display_name: optional_text(row, "display_name")?,
        locale_id: optional_text(row, "locale")?,
        created_at,
    })
}

/// Nullable text column; the `Any` driver refuses to decode NULL into `Option<String>`
fn optional_text<I>(row: &AnyRow, index: I) -> Result<Option<String>, sqlx::Error>
where
    I: ColumnIndex<AnyRow> + Copy,
{
    if row.try_get_raw(index)?.is_null() {
        return Ok(None);
    }
    row.try_get::<String, _>(index).map(Some)
}

/// Parse the textual `CURRENT_TIMESTAMP` form both backends produce
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S%.f").map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-03-05 07:08:09").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (7, 8, 9));

        assert!(parse_timestamp("2024-03-05 07:08:09.250").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_record_locale_fallback() {
        let mut record = PreferenceRecord {
            user_id: UserId::random(),
            display_name: None,
            locale_id: Some("en_US".to_string()),
            created_at: Utc::now(),
        };
        assert_eq!(record.locale(), Locale::English);

        record.locale_id = Some("tlh_QO".to_string());
        assert_eq!(record.locale(), Locale::SYSTEM_DEFAULT);

        record.locale_id = None;
        assert_eq!(record.locale(), Locale::SYSTEM_DEFAULT);
    }

    #[test]
    fn test_statements_use_placeholders() {
        for statement in [SELECT_LOCALE, SELECT_EXISTS, SELECT_RECORD, UPDATE_LOCALE, UPDATE_DISPLAY_NAME] {
            assert!(statement.contains("user_id = ?"));
        }
        assert!(INSERT_DEFAULT.contains("VALUES (?, ?, CURRENT_TIMESTAMP)"));
    }
}
