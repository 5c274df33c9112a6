//! Windowed row cache
//!
//! [`WindowedDataCache`] keeps a sparse, index-keyed copy of a server-side
//! table whose total length is only known from the server's answers. Callers
//! say which rows they are about to show with [`ensure_range`]; the cache
//! widens small requests to a batch, skips rows it already holds or has
//! already requested, debounces bursts of calls into a single fetch and
//! merges the response back into the store.
//!
//! Every invalidation (sort, search, parameter change, `clear`) bumps a
//! generation counter. Fetches carry the generation they were dispatched
//! under, and responses from an older generation are dropped.
//!
//! [`ensure_range`]: WindowedDataCache::ensure_range

mod config;
mod store;
mod window;

pub use config::*;
pub use store::RowStatus;
pub use window::*;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::Weak;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ConfigError;
use crate::error::TransportError;
use crate::event::ColumnsLoaded;
use crate::event::EventHandlers;
use crate::event::FetchFailed;
use crate::event::Loaded;
use crate::event::LoadingStarted;
use crate::model::Row;
use crate::query::QueryState;
use crate::transport::FetchRequest;
use crate::transport::FetchResponse;
use crate::transport::Transport;
use store::RowStore;

/// Lazily loaded, server-backed window over a virtual table.
///
/// Cheap to clone (uses `Arc` internally); clones share the same store.
/// Methods that schedule fetches must be called from within a Tokio runtime.
///
/// # Example
///
/// ```ignore
/// use gridwindow_lib::cache::{CacheConfig, WindowedDataCache};
/// use gridwindow_lib::transport::HttpTransport;
///
/// let transport = HttpTransport::builder()
///     .endpoint("https://example.com/grid/accounts")
///     .build()?;
/// let cache = WindowedDataCache::new(transport, CacheConfig::default())?;
///
/// cache.on_loaded().subscribe(|loaded| {
///     println!("rows {} are in", loaded.window);
/// });
///
/// // The grid shows rows 0..=30
/// cache.ensure_range(0, 30);
/// ```
#[derive(Clone)]
pub struct WindowedDataCache {
    inner: Arc<CacheInner>,
}

pub(crate) struct CacheInner {
    transport: Arc<dyn Transport>,
    max_window: usize,
    debounce: Duration,
    failure_policy: FailurePolicy,
    load_columns: bool,
    state: Mutex<CacheState>,
    events: CacheEvents,
}

struct CacheState {
    store: RowStore,
    query: QueryState,
    optimal_batch: usize,
    columns: Option<Arc<Vec<Value>>>,
    columns_stale: bool,
    generation: u64,
    scheduled: Option<ScheduledFetch>,
    next_schedule_id: u64,
    in_flight: usize,
}

/// A debounced fetch that has not fired yet.
struct ScheduledFetch {
    id: u64,
    window: Window,
    cancel: CancellationToken,
}

#[derive(Default)]
struct CacheEvents {
    loading_started: EventHandlers<LoadingStarted>,
    loaded: EventHandlers<Loaded>,
    columns_loaded: EventHandlers<ColumnsLoaded>,
    fetch_failed: EventHandlers<FetchFailed>,
}

/// A dispatched fetch, captured when its debounce fires.
struct Dispatch {
    request: FetchRequest,
    generation: u64,
    transport: Arc<dyn Transport>,
}

impl WindowedDataCache {
    /// Creates a cache bound to a transport.
    pub fn new(transport: impl Transport + 'static, config: CacheConfig) -> Result<Self, ConfigError> {
        Self::with_shared_transport(Arc::new(transport), config)
    }

    /// Creates a cache from a transport that is shared with other caches.
    pub fn with_shared_transport(
        transport: Arc<dyn Transport>,
        config: CacheConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(CacheInner {
                transport,
                max_window: config.max_window,
                debounce: config.debounce,
                failure_policy: config.failure_policy,
                load_columns: config.load_columns,
                state: Mutex::new(CacheState {
                    store: RowStore::new(),
                    query: config.query,
                    optimal_batch: config.optimal_batch,
                    columns: None,
                    columns_stale: config.load_columns,
                    generation: 0,
                    scheduled: None,
                    next_schedule_id: 0,
                    in_flight: 0,
                }),
                events: CacheEvents::default(),
            }),
        })
    }

    pub(crate) fn downgrade(&self) -> Weak<CacheInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<CacheInner>) -> Self {
        Self { inner }
    }

    // =========================================================================
    // Range operations
    // =========================================================================

    /// Makes rows `[from, to]` available, fetching whatever is missing.
    ///
    /// Does nothing when every row is already loaded or requested. Otherwise
    /// a fetch is scheduled after the debounce delay, replacing any fetch
    /// scheduled earlier that has not fired yet. Ranges longer than
    /// [`CacheConfig::max_window`] are cut at the upper end.
    pub fn ensure_range(&self, from: usize, to: usize) {
        let limit = from.saturating_add(self.inner.max_window - 1);
        let to = if to > limit {
            log::warn!(
                "ensure_range({}, {}) exceeds the window limit; fetching up to {}",
                from,
                to,
                limit
            );
            limit
        } else {
            to
        };

        let mut state = self.inner.lock();

        let optimal = state.optimal_batch;
        let store = &state.store;
        let Some(window) = plan_window(from, to, optimal, |i| store.is_occupied(i)) else {
            log::trace!("ensure_range({}, {}): nothing to fetch", from, to);
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::error!("ensure_range called outside a Tokio runtime; {} not scheduled", window);
            return;
        };

        if let Some(previous) = state.scheduled.take() {
            previous.cancel.cancel();
            log::debug!("Fetch for {} superseded by {}", previous.window, window);
        }

        let id = state.next_schedule_id;
        state.next_schedule_id += 1;
        let cancel = CancellationToken::new();
        state.scheduled = Some(ScheduledFetch {
            id,
            window,
            cancel: cancel.clone(),
        });
        drop(state);

        log::debug!("Scheduled fetch for {} (requested [{}, {}])", window, from, to);

        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.debounce;
        runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            run_fetch(weak, id).await;
        });
    }

    /// Returns `true` if every row in `[from, to]` is loaded.
    ///
    /// Pending rows count as not loaded.
    pub fn is_range_loaded(&self, from: usize, to: usize) -> bool {
        self.inner.lock().store.is_range_resolved(from, to)
    }

    /// Forgets rows `[from, to]` and fetches them again.
    pub fn reload_range(&self, from: usize, to: usize) {
        if let Some(window) = Window::new(from, to) {
            self.inner.lock().store.evict(window);
        }
        self.ensure_range(from, to);
    }

    // =========================================================================
    // Query state
    // =========================================================================

    /// Changes the sort and drops every cached row.
    pub fn set_sort(&self, field: Option<&str>, ascending: bool) {
        let mut state = self.inner.lock();
        state.query.sort = field.map(str::to_string);
        state.query.ascending = ascending;
        state.invalidate();
    }

    /// Changes the search text and drops every cached row.
    pub fn set_search(&self, text: impl Into<String>) {
        let mut state = self.inner.lock();
        state.query.search = text.into();
        state.invalidate();
    }

    /// Sets an extra request parameter.
    ///
    /// Loaded rows are kept; call [`clear`](Self::clear) if the parameter
    /// changes which rows the server returns. Fetches already in flight were
    /// sent with the old parameters: their responses are discarded on arrival
    /// without raising `Loaded` or `FetchFailed`, and their pending rows are
    /// released at once so `ensure_range` can request them again.
    pub fn set_param(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.inner.lock();
        state.query.params.insert(key.into(), value.into());
        state.retire_in_flight();
    }

    /// Removes an extra request parameter. See [`set_param`](Self::set_param).
    pub fn remove_param(&self, key: &str) {
        let mut state = self.inner.lock();
        if state.query.params.remove(key).is_some() {
            state.retire_in_flight();
        }
    }

    /// Requests column metadata again with the next fetch.
    ///
    /// Has no effect when column loading is disabled.
    pub fn invalidate_columns(&self) {
        if self.inner.load_columns {
            self.inner.lock().columns_stale = true;
        }
    }

    /// Drops every cached row and resets the length to 0.
    ///
    /// The query state is left untouched.
    pub fn clear(&self) {
        self.inner.lock().invalidate();
    }

    /// Cancels any scheduled fetch and drops every cached row.
    ///
    /// Responses still in flight are discarded when they arrive.
    pub fn shutdown(&self) {
        let mut state = self.inner.lock();
        if let Some(scheduled) = state.scheduled.take() {
            scheduled.cancel.cancel();
        }
        state.invalidate();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Believed total number of rows.
    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    /// Returns `true` if the believed total is 0.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a loaded row.
    pub fn row(&self, index: usize) -> Option<Row> {
        self.inner.lock().store.get(index).cloned()
    }

    /// Returns the loaded rows in `[from, to]`, skipping missing ones.
    pub fn rows(&self, from: usize, to: usize) -> Vec<Row> {
        self.inner.lock().store.resolved_in(from, to)
    }

    /// Returns whether a row is absent, pending or loaded.
    pub fn status(&self, index: usize) -> RowStatus {
        self.inner.lock().store.status(index)
    }

    /// Number of rows currently marked pending.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().store.pending_count()
    }

    /// Column descriptors from the most recent column load.
    pub fn columns(&self) -> Option<Arc<Vec<Value>>> {
        self.inner.lock().columns.clone()
    }

    /// Returns `true` if the next fetch will request columns.
    pub fn columns_stale(&self) -> bool {
        self.inner.lock().columns_stale
    }

    /// A snapshot of the current query state.
    pub fn query(&self) -> QueryState {
        self.inner.lock().query.clone()
    }

    /// Current target batch size.
    pub fn optimal_batch(&self) -> usize {
        self.inner.lock().optimal_batch
    }

    /// Current invalidation generation.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// The window waiting on the debounce timer, if any.
    pub fn scheduled_window(&self) -> Option<Window> {
        self.inner.lock().scheduled.as_ref().map(|s| s.window)
    }

    /// Number of fetches dispatched and not yet answered.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Raised when a fetch is dispatched.
    pub fn on_loading_started(&self) -> &EventHandlers<LoadingStarted> {
        &self.inner.events.loading_started
    }

    /// Raised after a response has been merged.
    pub fn on_loaded(&self) -> &EventHandlers<Loaded> {
        &self.inner.events.loaded
    }

    /// Raised when column metadata arrives.
    pub fn on_columns_loaded(&self) -> &EventHandlers<ColumnsLoaded> {
        &self.inner.events.columns_loaded
    }

    /// Raised when the transport fails.
    pub fn on_fetch_failed(&self) -> &EventHandlers<FetchFailed> {
        &self.inner.events.fetch_failed
    }
}

impl std::fmt::Debug for WindowedDataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("WindowedDataCache")
            .field("length", &state.store.len())
            .field("generation", &state.generation)
            .field("optimal_batch", &state.optimal_batch)
            .field("in_flight", &state.in_flight)
            .finish()
    }
}

impl CacheState {
    /// Drops all rows and retires every outstanding response.
    fn invalidate(&mut self) {
        self.store.clear();
        self.generation += 1;
    }

    /// Retires outstanding responses without dropping loaded rows.
    fn retire_in_flight(&mut self) {
        self.store.evict_all_pending();
        self.generation += 1;
    }
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fires the scheduled fetch `id`, unless it has been superseded.
    fn dispatch(&self, id: u64) -> Option<Dispatch> {
        let mut state = self.lock();
        if state.scheduled.as_ref().map(|s| s.id) != Some(id) {
            return None;
        }
        let scheduled = state.scheduled.take()?;
        let window = scheduled.window;

        state.store.mark_pending(window);
        state.in_flight += 1;
        let request = FetchRequest::new(window, &state.query, state.columns_stale);
        let generation = state.generation;
        drop(state);

        log::debug!(
            "Fetching {} (generation {}, columns: {})",
            window,
            generation,
            request.load_columns
        );
        self.events.loading_started.notify(&LoadingStarted { window });

        Some(Dispatch {
            request,
            generation,
            transport: self.transport.clone(),
        })
    }

    /// Merges a response into the store.
    fn reconcile(&self, request: &FetchRequest, generation: u64, response: FetchResponse) {
        let window = request.window;
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        if state.generation != generation {
            log::debug!(
                "Discarding response for {} from generation {} (now {})",
                window,
                generation,
                state.generation
            );
            return;
        }

        if state.store.len() != response.total {
            log::debug!(
                "Total changed from {} to {}; dropping cached rows",
                state.store.len(),
                response.total
            );
            state.store.clear();
            state.store.set_len(response.total);
        }

        let received = response.rows.len();
        if received < window.len() {
            if let Some(tail) = Window::new(window.from + received, window.to) {
                state.store.evict(tail);
            }
            state.optimal_batch = received.max(1);
            log::debug!(
                "Short read for {}: {} of {} rows; batch size now {}",
                window,
                received,
                window.len(),
                state.optimal_batch
            );
        }

        for (offset, row) in response.rows.into_iter().enumerate() {
            let Some(index) = window.from.checked_add(offset) else {
                break;
            };
            state.store.resolve(index, row);
        }

        let mut columns_loaded = None;
        if request.load_columns {
            match response.columns {
                Some(columns) => {
                    let columns = Arc::new(columns);
                    state.columns = Some(columns.clone());
                    state.columns_stale = false;
                    columns_loaded = Some(ColumnsLoaded { columns });
                }
                None => log::warn!("Columns requested with {} but none returned", window),
            }
        }
        drop(state);

        if let Some(event) = columns_loaded {
            self.events.columns_loaded.notify(&event);
        }
        self.events.loaded.notify(&Loaded { window });
    }

    /// Records a transport failure.
    fn fail(&self, window: Window, generation: u64, error: TransportError) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        if state.generation != generation {
            log::debug!("Ignoring failure for {} from generation {}: {}", window, generation, error);
            return;
        }

        if self.failure_policy == FailurePolicy::RevertToAbsent {
            state.store.evict_pending(window);
        }
        drop(state);

        log::warn!("Fetch for {} failed: {}", window, error);
        self.events.fetch_failed.notify(&FetchFailed {
            window,
            error: Arc::new(error),
        });
    }
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(scheduled) = state.scheduled.take() {
            scheduled.cancel.cancel();
        }
    }
}

/// Runs a fetch whose debounce has elapsed.
///
/// Only a weak handle is kept across the request, so dropping the cache
/// while a fetch is in flight discards the response.
async fn run_fetch(weak: Weak<CacheInner>, id: u64) {
    let dispatch = {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        match inner.dispatch(id) {
            Some(dispatch) => dispatch,
            None => return,
        }
    };

    let Dispatch {
        request,
        generation,
        transport,
    } = dispatch;
    let result = transport.fetch(request.clone()).await;

    let Some(inner) = weak.upgrade() else {
        return;
    };
    match result {
        Ok(response) => inner.reconcile(&request, generation, response),
        Err(error) => inner.fail(request.window, generation, error),
    }
}
