//! Cache configuration

use std::time::Duration;

use crate::error::ConfigError;
use crate::query::QueryState;

/// What happens to the pending rows of a window whose fetch failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Drop the pending markers so the next `ensure_range` fetches the rows again.
    #[default]
    RevertToAbsent,
    /// Leave the rows pending; only `reload_range` or an invalidation frees them.
    KeepPending,
}

/// Configuration for a [`WindowedDataCache`](super::WindowedDataCache).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use gridwindow_lib::cache::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_optimal_batch(250)
///     .with_debounce(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Target rows per fetch. Smaller requests are widened to this size.
    ///
    /// Default: 100. Shrinks at runtime when the server returns short pages.
    pub optimal_batch: usize,

    /// Largest span a single `ensure_range` call asks for.
    ///
    /// Longer requests are cut at the upper end. Default: 10 000
    pub max_window: usize,

    /// Delay between the last `ensure_range` call and the fetch it schedules.
    ///
    /// Default: 100 ms
    pub debounce: Duration,

    /// Whether column metadata is requested with the first fetch.
    ///
    /// Default: true
    pub load_columns: bool,

    /// Handling of pending rows after a transport failure.
    pub failure_policy: FailurePolicy,

    /// Query state the cache starts with.
    pub query: QueryState,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            optimal_batch: 100,
            max_window: 10_000,
            debounce: Duration::from_millis(100),
            load_columns: true,
            failure_policy: FailurePolicy::default(),
            query: QueryState::default(),
        }
    }
}

impl CacheConfig {
    /// Creates a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the optimal batch size.
    pub fn with_optimal_batch(mut self, rows: usize) -> Self {
        self.optimal_batch = rows;
        self
    }

    /// Sets the largest span a single request may cover.
    pub fn with_max_window(mut self, rows: usize) -> Self {
        self.max_window = rows;
        self
    }

    /// Sets the debounce delay.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    /// Disables column metadata requests.
    pub fn without_columns(mut self) -> Self {
        self.load_columns = false;
        self
    }

    /// Sets the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Sets the initial query state.
    pub fn with_query(mut self, query: QueryState) -> Self {
        self.query = query;
        self
    }

    /// Checks the configuration for values the cache cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.optimal_batch == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.max_window == 0 {
            return Err(ConfigError::ZeroMaxWindow);
        }
        Ok(())
    }
}
