//! Integration tests for the persistence gateway against SQLite files.

use lingo_common::test_utils::{create_temp_dir, init_test_logging};
use lingo_config::DatabaseConfig;
use lingo_store::{PersistenceGateway, RetryPolicy, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn sqlite_config(dir: &TempDir, max_connections: u32) -> DatabaseConfig {
    let path = dir.path().join("gateway.db");
    DatabaseConfig {
        max_connections,
        retry_backoff_ms: 10,
        ..DatabaseConfig::sqlite(path.to_string_lossy())
    }
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    init_test_logging();
    let dir = create_temp_dir();
    let gateway = PersistenceGateway::new(sqlite_config(&dir, 2)).unwrap();

    assert!(!gateway.is_initialized());
    gateway.initialize().await.unwrap();
    gateway.initialize().await.unwrap();

    assert!(gateway.is_initialized());
    assert!(gateway.is_reachable());
    assert!(gateway.stats().is_some());
}

#[tokio::test]
async fn test_concurrent_initialize_builds_one_pool() {
    init_test_logging();
    let dir = create_temp_dir();
    let gateway = Arc::new(PersistenceGateway::new(sqlite_config(&dir, 3)).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.initialize().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = gateway.stats().unwrap();
    assert!(stats.size <= stats.max_connections);
    assert_eq!(stats.max_connections, 3);
}

#[tokio::test]
async fn test_scoped_connection_returns_to_pool() {
    init_test_logging();
    let dir = create_temp_dir();
    let gateway = PersistenceGateway::new(sqlite_config(&dir, 1)).unwrap();

    for _ in 0..5 {
        let conn = gateway.acquire().await.unwrap();
        drop(conn);
    }
    gateway.ping().await.unwrap();

    let stats = gateway.stats().unwrap();
    assert_eq!(stats.size, 1);
}

#[tokio::test]
async fn test_saturated_pool_exhausts_retry_budget() {
    init_test_logging();
    let dir = create_temp_dir();
    let gateway = PersistenceGateway::new(sqlite_config(&dir, 1))
        .unwrap()
        .with_acquire_timeout(Duration::from_millis(100))
        .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(5)));

    let held = gateway.acquire().await.unwrap();
    let err = gateway.acquire().await.unwrap_err();

    assert!(matches!(err, StoreError::LinkExhausted { attempts: 3, .. }));
    assert!(err.is_timeout());
    assert!(!gateway.is_reachable());

    drop(held);
    gateway.ping().await.unwrap();
    assert!(gateway.is_reachable());
}

#[tokio::test]
async fn test_unreachable_server_is_link_exhausted() {
    init_test_logging();
    let config = DatabaseConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        acquire_timeout_seconds: 1,
        retry_attempts: 2,
        retry_backoff_ms: 0,
        ..DatabaseConfig::default()
    };
    let gateway = PersistenceGateway::new(config).unwrap();

    let err = gateway.initialize().await.unwrap_err();
    assert!(matches!(err, StoreError::LinkExhausted { attempts: 2, .. }));
    assert!(!gateway.is_initialized());
    assert!(!gateway.is_reachable());
}

#[tokio::test]
async fn test_close_makes_gateway_unusable() {
    init_test_logging();
    let dir = create_temp_dir();
    let gateway = PersistenceGateway::new(sqlite_config(&dir, 2)).unwrap();
    gateway.initialize().await.unwrap();

    gateway.close().await;

    assert!(!gateway.is_reachable());
    assert!(matches!(
        gateway.acquire().await,
        Err(StoreError::ConnectionLost { .. })
    ));
}

#[tokio::test]
async fn test_unopenable_database_is_configuration_error() {
    init_test_logging();
    let config = DatabaseConfig {
        retry_backoff_ms: 10,
        ..DatabaseConfig::sqlite("/nonexistent-dir/deeper/lingo.db")
    };
    let gateway = PersistenceGateway::new(config).unwrap();

    let err = gateway.initialize().await.unwrap_err();
    assert!(matches!(err, StoreError::ConfigurationInvalid { .. }), "got {err}");
    assert!(!gateway.is_initialized());
}
