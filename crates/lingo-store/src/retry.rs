//! Failure classification and the bounded retry policy

use crate::error::{StoreError, StoreResult};
use lingo_config::DatabaseConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// How a driver error is treated by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The link is temporarily unusable; worth another attempt
    Transient,
    /// Bad settings or rejected credentials; never retried
    Configuration,
    /// The pool was shut down
    Closed,
    /// Statement-level failure; surfaced as is
    Other,
}

/// Classify a driver error
pub fn classify(err: &sqlx::Error) -> FailureKind {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed | sqlx::Error::Protocol(_) => {
            FailureKind::Transient
        }
        sqlx::Error::Configuration(_) | sqlx::Error::Tls(_) | sqlx::Error::AnyDriverError(_) => {
            FailureKind::Configuration
        }
        sqlx::Error::PoolClosed => FailureKind::Closed,
        sqlx::Error::Database(db_err) => classify_database(db_err.as_ref()),
        _ => FailureKind::Other,
    }
}

/// SQLite primary result codes for a busy or locked database
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
/// SQLite primary result codes for a file that cannot be opened or a denied authorizer
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_AUTH: i32 = 23;

/// MySQL server errors that clear up on their own
const MYSQL_TRANSIENT: [u16; 4] = [
    1040, // too many connections
    1205, // lock wait timeout
    1213, // deadlock
    1053, // server shutdown in progress
];

/// MySQL server errors caused by credentials or schema selection
const MYSQL_CONFIGURATION: [u16; 3] = [
    1044, // access denied to database
    1045, // access denied for user
    1049, // unknown database
];

fn classify_database(db_err: &dyn sqlx::error::DatabaseError) -> FailureKind {
    if let Some(mysql) = db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
        let number = mysql.number();
        if MYSQL_TRANSIENT.contains(&number) {
            return FailureKind::Transient;
        }
        if MYSQL_CONFIGURATION.contains(&number) {
            return FailureKind::Configuration;
        }
        return FailureKind::Other;
    }

    let code = db_err.code();
    if code.as_deref() == Some("28000") {
        return FailureKind::Configuration;
    }
    match code.and_then(|c| c.parse::<i32>().ok()).map(|c| c & 0xff) {
        Some(SQLITE_BUSY | SQLITE_LOCKED) => FailureKind::Transient,
        Some(SQLITE_CANTOPEN | SQLITE_AUTH) => FailureKind::Configuration,
        _ => FailureKind::Other,
    }
}

/// What to do after a failed attempt
#[derive(Debug)]
pub enum RetryDecision {
    /// Wait this long, then try again
    RetryAfter(Duration),
    /// Stop and report this error
    GiveUp(StoreError),
}

/// Bounded retry with linear backoff: attempt `n` is followed by a wait of `n * backoff`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy; a budget of zero is raised to one attempt
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Policy described by the database configuration
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.retry_attempts, Duration::from_millis(config.retry_backoff_ms))
    }

    /// Total number of attempts, including the first
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Decide how to continue after attempt number `attempt` (1-based) failed with `err`
    pub fn decide(&self, operation: &str, attempt: u32, err: sqlx::Error) -> RetryDecision {
        match classify(&err) {
            FailureKind::Transient if attempt < self.attempts => {
                let delay = self.delay_for(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts = self.attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Transient store failure, retrying"
                );
                RetryDecision::RetryAfter(delay)
            }
            FailureKind::Transient => {
                error!(operation, attempts = self.attempts, error = %err, "Preference store link exhausted");
                RetryDecision::GiveUp(StoreError::LinkExhausted {
                    attempts: self.attempts,
                    source: err,
                })
            }
            FailureKind::Configuration => {
                error!(operation, error = %err, "Store configuration rejected");
                RetryDecision::GiveUp(StoreError::ConfigurationInvalid {
                    message: err.to_string(),
                })
            }
            FailureKind::Closed => RetryDecision::GiveUp(StoreError::ConnectionLost { source: err }),
            FailureKind::Other => RetryDecision::GiveUp(StoreError::Database { source: err }),
        }
    }

    /// Run `attempt_fn` until it succeeds, fails permanently or the budget is spent.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> StoreResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => match self.decide(operation, attempt, err) {
                    RetryDecision::RetryAfter(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::GiveUp(err) => return Err(err),
                },
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}
