//! Pooled access to the preference database
//!
//! The gateway owns exactly one connection pool, created lazily on first use
//! and verified with a ping. All access goes through scoped connections that
//! return to the pool when dropped, and every attempt is bounded by the
//! configured acquire timeout and retry budget.

use crate::dialect::Dialect;
use crate::error::{StoreError, StoreResult};
use crate::retry::{RetryDecision, RetryPolicy};
use futures::future::BoxFuture;
use lingo_config::DatabaseConfig;
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, AnyPool, Connection};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use validator::Validate;

/// A pooled connection that goes back to the pool when dropped
pub struct ScopedConnection {
    inner: PoolConnection<Any>,
}

impl Deref for ScopedConnection {
    type Target = AnyConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ScopedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl std::fmt::Debug for ScopedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedConnection").finish_non_exhaustive()
    }
}

/// Point-in-time pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Open connections, idle or in use
    pub size: u32,
    /// Connections waiting in the pool
    pub idle: usize,
    /// Configured upper bound
    pub max_connections: u32,
}

/// Gateway to the relational store backing user preferences
pub struct PersistenceGateway {
    config: DatabaseConfig,
    dialect: Dialect,
    policy: RetryPolicy,
    acquire_timeout: Duration,
    pool: OnceCell<AnyPool>,
    reachable: AtomicBool,
    closed: AtomicBool,
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("initialized", &self.is_initialized())
            .field("reachable", &self.is_reachable())
            .finish_non_exhaustive()
    }
}

impl PersistenceGateway {
    /// Create a gateway; no connection is opened until first use
    pub fn new(config: DatabaseConfig) -> StoreResult<Self> {
        config.validate().map_err(|e| StoreError::ConfigurationInvalid {
            message: e.to_string(),
        })?;

        let dialect = Dialect::for_backend(config.backend);
        dialect.connection_url(&config)?;

        Ok(Self {
            policy: RetryPolicy::from_config(&config),
            acquire_timeout: Duration::from_secs(config.acquire_timeout_seconds),
            dialect,
            config,
            pool: OnceCell::new(),
            reachable: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Override the per-attempt wait for a pooled connection
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// SQL dialect of the configured backend
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Retry policy in effect
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Build and verify the pool; a no-op once that has succeeded.
    ///
    /// Concurrent callers share one initialization. A failed attempt leaves
    /// the gateway uninitialized so the next call starts over.
    pub async fn initialize(&self) -> StoreResult<()> {
        self.pool().await.map(|_| ())
    }

    /// Whether the pool has been built and verified
    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    /// Link state observed by the most recent operation
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }

    async fn pool(&self) -> StoreResult<&AnyPool> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::ConnectionLost {
                source: sqlx::Error::PoolClosed,
            });
        }
        self.pool.get_or_try_init(|| self.build_pool()).await
    }

    async fn build_pool(&self) -> StoreResult<AnyPool> {
        sqlx::any::install_default_drivers();

        let url = self.dialect.connection_url(&self.config)?;
        let options = AnyConnectOptions::from_str(&url).map_err(|e| StoreError::ConfigurationInvalid {
            message: e.to_string(),
        })?;

        info!(
            backend = %self.config.backend,
            database = %self.config.database,
            max_connections = self.config.max_connections,
            "Initializing preference store pool"
        );

        let pool = AnyPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .test_before_acquire(true)
            .connect_lazy_with(options);

        let verified = self
            .policy
            .run("initialize", |_| {
                let pool = pool.clone();
                async move {
                    let mut conn = pool.acquire().await?;
                    conn.ping().await
                }
            })
            .await;

        match verified {
            Ok(()) => {
                self.reachable.store(true, Ordering::Release);
                info!("Preference store pool ready");
                Ok(pool)
            }
            Err(e) => {
                self.reachable.store(false, Ordering::Release);
                pool.close().await;
                Err(e)
            }
        }
    }

    /// Acquire a scoped connection, initializing the pool on first use
    pub async fn acquire(&self) -> StoreResult<ScopedConnection> {
        let pool = self.pool().await?;
        let result = self
            .policy
            .run("acquire", |_| pool.acquire())
            .await
            .map(|inner| ScopedConnection { inner });
        self.observe(&result);
        result
    }

    /// Run `op` on a scoped connection.
    ///
    /// A transient failure drops the connection and repeats the whole
    /// operation on a fresh one, within the same retry budget. `op` must
    /// therefore be safe to run more than once.
    pub async fn with_connection<T, F>(&self, operation: &str, mut op: F) -> StoreResult<T>
    where
        T: Send,
        F: for<'c> FnMut(&'c mut AnyConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>,
    {
        let pool = self.pool().await?;
        let mut attempt = 1;

        let result = loop {
            let outcome = match pool.acquire().await {
                Ok(mut conn) => op(&mut *conn).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => break Ok(value),
                Err(e) => match self.policy.decide(operation, attempt, e) {
                    RetryDecision::RetryAfter(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::GiveUp(err) => break Err(err),
                },
            }
        };

        self.observe(&result);
        result
    }

    /// Round trip to the database
    pub async fn ping(&self) -> StoreResult<()> {
        self.with_connection("ping", |conn| conn.ping()).await
    }

    /// Pool occupancy, or `None` before initialization
    pub fn stats(&self) -> Option<PoolStats> {
        self.pool.get().map(|pool| PoolStats {
            size: pool.size(),
            idle: pool.num_idle(),
            max_connections: self.config.max_connections,
        })
    }

    /// Close the pool; waits for checked-out connections to come back.
    ///
    /// Later operations fail with [`StoreError::ConnectionLost`].
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.reachable.store(false, Ordering::Release);
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            info!("Preference store pool closed");
        }
    }

    fn observe<T>(&self, result: &StoreResult<T>) {
        match result {
            Ok(_) => {
                if !self.reachable.swap(true, Ordering::AcqRel) {
                    info!("Preference store reachable again");
                }
            }
            Err(e) if e.is_link_failure() => {
                if self.reachable.swap(false, Ordering::AcqRel) {
                    warn!(error = %e, "Preference store marked unreachable");
                }
            }
            Err(e) => debug!(error = %e, "Store operation failed"),
        }
    }
}
