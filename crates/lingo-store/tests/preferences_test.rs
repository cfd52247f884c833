//! Integration tests for the preference store against SQLite files.

use lingo_common::test_utils::{create_temp_dir, init_test_logging, test_user_ids};
use lingo_common::UserId;
use lingo_config::DatabaseConfig;
use lingo_i18n::Locale;
use lingo_store::{PersistenceGateway, PreferenceStore, StoreError, PREFERENCES_TABLE};
use sqlx::Row;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup(dir: &TempDir) -> PreferenceStore {
    init_test_logging();
    let path = dir.path().join("preferences.db");
    let config = DatabaseConfig {
        max_connections: 4,
        retry_backoff_ms: 10,
        ..DatabaseConfig::sqlite(path.to_string_lossy())
    };
    let gateway = Arc::new(PersistenceGateway::new(config).unwrap());
    let store = PreferenceStore::new(gateway);
    store.ensure_schema().await.unwrap();
    store
}

#[tokio::test]
async fn test_ensure_schema_is_idempotent() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    store.ensure_schema().await.unwrap();
    store.ensure_schema().await.unwrap();
}

#[tokio::test]
async fn test_load_unknown_user_returns_default_without_row() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();

    assert_eq!(store.load(user).await.unwrap(), Locale::SYSTEM_DEFAULT);
    assert!(!store.exists(user).await.unwrap());
    assert!(store.record(user).await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_then_duplicate() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();

    store.insert(user).await.unwrap();
    assert!(store.exists(user).await.unwrap());
    assert_eq!(store.load(user).await.unwrap(), Locale::SYSTEM_DEFAULT);

    let err = store.insert(user).await.unwrap_err();
    match err {
        StoreError::DuplicateEntry { user_id } => assert_eq!(user_id, user),
        other => panic!("expected DuplicateEntry, got {other}"),
    }
}

#[tokio::test]
async fn test_set_locale_after_insert() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();

    store.insert(user).await.unwrap();
    store.set_locale(user, Locale::English).await.unwrap();
    assert_eq!(store.load(user).await.unwrap(), Locale::English);

    // Same value again still counts as a match.
    store.set_locale(user, Locale::English).await.unwrap();
}

#[tokio::test]
async fn test_set_locale_without_row_fails() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();

    let err = store.set_locale(user, Locale::English).await.unwrap_err();
    assert!(matches!(err, StoreError::PreferenceNotFound { .. }));
    assert!(!store.exists(user).await.unwrap());
}

#[tokio::test]
async fn test_upsert_creates_then_updates() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();

    store.upsert_locale(user, Locale::English).await.unwrap();
    assert!(store.exists(user).await.unwrap());
    assert_eq!(store.load(user).await.unwrap(), Locale::English);

    store.upsert_locale(user, Locale::German).await.unwrap();
    assert_eq!(store.load(user).await.unwrap(), Locale::German);
}

#[tokio::test]
async fn test_unrecognized_stored_locale_falls_back() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();
    store.insert(user).await.unwrap();

    let key = user.to_storage_key();
    store
        .gateway()
        .with_connection("corrupt", |conn| {
            let key = key.clone();
            Box::pin(async move {
                let sql = format!("UPDATE {PREFERENCES_TABLE} SET locale = ? WHERE user_id = ?");
                sqlx::query(&sql)
                    .bind("xx_YY")
                    .bind(key)
                    .execute(conn)
                    .await
                    .map(|_| ())
            })
        })
        .await
        .unwrap();

    assert_eq!(store.load(user).await.unwrap(), Locale::SYSTEM_DEFAULT);
    let record = store.record(user).await.unwrap().unwrap();
    assert_eq!(record.locale_id.as_deref(), Some("xx_YY"));
    assert_eq!(record.locale(), Locale::SYSTEM_DEFAULT);
}

async fn clear_column(store: &PreferenceStore, user: UserId, column: &'static str) {
    let key = user.to_storage_key();
    store
        .gateway()
        .with_connection("clear", |conn| {
            let key = key.clone();
            Box::pin(async move {
                let sql = format!("UPDATE {PREFERENCES_TABLE} SET {column} = NULL WHERE user_id = ?");
                sqlx::query(&sql).bind(key).execute(conn).await.map(|_| ())
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_null_locale_falls_back() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();
    store.upsert_locale(user, Locale::English).await.unwrap();

    clear_column(&store, user, "locale").await;

    assert_eq!(store.load(user).await.unwrap(), Locale::SYSTEM_DEFAULT);
    let record = store.record(user).await.unwrap().unwrap();
    assert!(record.locale_id.is_none());
    assert_eq!(record.locale(), Locale::SYSTEM_DEFAULT);
}

#[tokio::test]
async fn test_fresh_row_has_no_display_name() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();
    store.insert(user).await.unwrap();

    let record = store.record(user).await.unwrap().unwrap();
    assert!(record.display_name.is_none());
    assert_eq!(record.locale_id.as_deref(), Some(Locale::SYSTEM_DEFAULT.canonical_id()));

    store.set_display_name(user, Some("Steve")).await.unwrap();
    clear_column(&store, user, "display_name").await;
    assert!(store.record(user).await.unwrap().unwrap().display_name.is_none());
}

#[tokio::test]
async fn test_record_and_display_name() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();

    store.upsert_locale(user, Locale::English).await.unwrap();
    store
        .set_display_name(user, Some("  A very long display name that goes past the limit  "))
        .await
        .unwrap();

    let record = store.record(user).await.unwrap().unwrap();
    assert_eq!(record.user_id, user);
    assert_eq!(record.locale(), Locale::English);
    let name = record.display_name.unwrap();
    assert_eq!(name.chars().count(), 32);
    assert!(name.starts_with("A very long"));
    assert!(record.created_at <= chrono::Utc::now() + chrono::Duration::minutes(1));

    store.set_display_name(user, None).await.unwrap();
    assert!(store.record(user).await.unwrap().unwrap().display_name.is_none());
}

#[tokio::test]
async fn test_set_display_name_without_row_fails() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;

    let err = store.set_display_name(UserId::random(), Some("Ghost")).await.unwrap_err();
    assert!(matches!(err, StoreError::PreferenceNotFound { .. }));
}

#[tokio::test]
async fn test_parallel_users_are_independent() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let users = test_user_ids(16);

    let handles: Vec<_> = users
        .iter()
        .enumerate()
        .map(|(i, &user)| {
            let store = store.clone();
            let locale = if i % 2 == 0 { Locale::English } else { Locale::German };
            tokio::spawn(async move {
                store.upsert_locale(user, locale).await?;
                store.load(user).await
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected = if i % 2 == 0 { Locale::English } else { Locale::German };
        assert_eq!(handle.await.unwrap().unwrap(), expected);
    }

    let count: i64 = store
        .gateway()
        .with_connection("count", |conn| {
            Box::pin(async move {
                let sql = format!("SELECT COUNT(*) FROM {PREFERENCES_TABLE}");
                let row = sqlx::query(&sql)
                    .fetch_one(conn)
                    .await?;
                row.try_get::<i64, _>(0)
            })
        })
        .await
        .unwrap();
    assert_eq!(count, 16);
}

#[tokio::test]
async fn test_concurrent_upserts_same_user_leave_one_row() {
    let dir = create_temp_dir();
    let store = setup(&dir).await;
    let user = UserId::random();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            let locale = if i % 2 == 0 { Locale::English } else { Locale::German };
            tokio::spawn(async move { store.upsert_locale(user, locale).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(store.exists(user).await.unwrap());
    assert!(matches!(store.insert(user).await, Err(StoreError::DuplicateEntry { .. })));
}
