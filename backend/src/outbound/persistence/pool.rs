//! Async connection pool shared by the commerce repositories.
//!
//! Wraps `diesel-async`'s `bb8` integration. Every adapter holds a cheap
//! clone of [`DbPool`] and checks out one connection per port call; the
//! transactional operations (order placement, cancellation, fulfilment
//! recording) keep that connection for the whole transaction.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use tracing::debug;

/// Pool setup or checkout failure. Repositories surface both as their
/// `Connection` variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No connection became available in time.
    #[error("commerce database checkout failed: {message}")]
    Checkout { message: String },

    /// The pool could not be opened.
    #[error("commerce database pool unavailable: {message}")]
    Build { message: String },
}

impl PoolError {
    /// Shorthand for [`Self::Checkout`].
    pub fn checkout(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Checkout { message }
    }

    /// Shorthand for [`Self::Build`].
    pub fn build(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Build { message }
    }
}

/// Sizing and timeout settings for [`DbPool`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use commerce::outbound::persistence::PoolConfig;
///
/// let config = PoolConfig::new("postgres://commerce@localhost/commerce")
///     .with_max_size(16)
///     .with_min_idle(None)
///     .with_connection_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_size(), 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Default upper bound on open connections.
    pub const DEFAULT_MAX_SIZE: u32 = 10;
    /// Default number of idle connections kept warm.
    pub const DEFAULT_MIN_IDLE: u32 = 2;
    /// Default checkout timeout.
    pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a configuration for `database_url` with default sizing.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: Self::DEFAULT_MAX_SIZE,
            min_idle: Some(Self::DEFAULT_MIN_IDLE),
            connection_timeout: Self::DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    /// Cap on open connections.
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Idle connections to keep warm; `None` lets bb8 drop them all.
    #[must_use]
    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// How long a checkout may wait.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Database URL the pool connects to.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Maximum number of open connections.
    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Idle connections kept open.
    pub fn min_idle(&self) -> Option<u32> {
        self.min_idle
    }

    /// Checkout timeout.
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }
}

/// Cloneable handle to the PostgreSQL connection pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build a pool from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Build`] when the pool cannot be constructed,
    /// for example because the URL is malformed or the server refuses the
    /// initial idle connections.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let PoolConfig {
            database_url,
            max_size,
            min_idle,
            connection_timeout,
        } = config;
        let inner = Pool::builder()
            .max_size(max_size)
            .min_idle(min_idle)
            .connection_timeout(connection_timeout)
            .build(AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url))
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        debug!(max_size, min_idle = ?min_idle, "database pool ready");
        Ok(Self { inner })
    }

    /// Check out a connection.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Checkout`] when no connection becomes available
    /// within the configured timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    //! Unit coverage for pool configuration.

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_match_documented_values() {
        let config = PoolConfig::new("postgres://localhost/commerce");

        assert_eq!(config.database_url(), "postgres://localhost/commerce");
        assert_eq!(config.max_size(), 10);
        assert_eq!(config.min_idle(), Some(2));
        assert_eq!(config.connection_timeout(), Duration::from_secs(30));
    }

    #[rstest]
    fn builder_overrides_each_setting() {
        let config = PoolConfig::new("postgres://localhost/commerce")
            .with_max_size(4)
            .with_min_idle(None)
            .with_connection_timeout(Duration::from_secs(3));

        assert_eq!(config.max_size(), 4);
        assert_eq!(config.min_idle(), None);
        assert_eq!(config.connection_timeout(), Duration::from_secs(3));
    }

    #[rstest]
    #[case(PoolError::checkout("connection refused"), "connection refused")]
    #[case(PoolError::build("invalid URL"), "invalid URL")]
    fn errors_carry_their_message(#[case] error: PoolError, #[case] message: &str) {
        assert!(error.to_string().contains(message));
    }
}
