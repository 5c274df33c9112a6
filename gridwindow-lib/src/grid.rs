//! Binding between a cache and a visual grid
//!
//! The grid itself lives outside this crate. It is reached through
//! [`GridView`], which reports the visible rows and receives redraw
//! requests; [`GridBinding`] forwards cache events to it and viewport
//! changes back to the cache.

use std::sync::Arc;

use serde_json::Value;

use crate::cache::Window;
use crate::cache::WindowedDataCache;
use crate::event::SubscriptionId;

/// Rows requested by [`GridBinding::reload`] before the grid reports a viewport.
pub const INITIAL_ROWS: Window = Window { from: 0, to: 10 };

/// The consumer-side grid a cache feeds.
pub trait GridView: Send + Sync {
    /// Currently visible rows, or `None` when nothing is visible.
    fn viewport(&self) -> Option<Window>;

    /// Marks rows as stale so they are redrawn from the cache.
    fn invalidate_rows(&self, window: Window);

    /// Updates the number of rows the grid scrolls over.
    fn set_row_count(&self, count: usize);

    /// Redraws invalidated rows.
    fn render(&self);

    /// Replaces the column set.
    fn set_columns(&self, columns: &[Value]);

    /// Shows or hides a loading indicator.
    fn set_loading(&self, _loading: bool) {}
}

struct Subscriptions {
    loading_started: SubscriptionId,
    loaded: SubscriptionId,
    columns_loaded: SubscriptionId,
    fetch_failed: SubscriptionId,
}

/// Keeps a [`GridView`] in sync with a [`WindowedDataCache`].
///
/// Subscriptions are removed when the binding is dropped.
///
/// # Example
///
/// ```ignore
/// let binding = GridBinding::new(cache.clone(), Arc::new(my_grid));
/// binding.reload();
///
/// // later, from the grid's scroll handler
/// binding.viewport_changed();
/// ```
pub struct GridBinding<V: GridView + 'static> {
    cache: WindowedDataCache,
    view: Arc<V>,
    subscriptions: Subscriptions,
}

impl<V: GridView + 'static> GridBinding<V> {
    /// Subscribes `view` to the cache's events.
    pub fn new(cache: WindowedDataCache, view: Arc<V>) -> Self {
        let loading_started = {
            let view = view.clone();
            cache
                .on_loading_started()
                .subscribe(move |_| view.set_loading(true))
        };

        // The cache owns its handlers, so they only hold it weakly.
        let loaded = {
            let view = view.clone();
            let weak = cache.downgrade();
            cache.on_loaded().subscribe(move |event| {
                view.invalidate_rows(event.window);
                if let Some(inner) = weak.upgrade() {
                    view.set_row_count(WindowedDataCache::from_inner(inner).len());
                }
                view.render();
                view.set_loading(false);
            })
        };

        let columns_loaded = {
            let view = view.clone();
            cache
                .on_columns_loaded()
                .subscribe(move |event| view.set_columns(&event.columns))
        };

        let fetch_failed = {
            let view = view.clone();
            cache
                .on_fetch_failed()
                .subscribe(move |_| view.set_loading(false))
        };

        Self {
            cache,
            view,
            subscriptions: Subscriptions {
                loading_started,
                loaded,
                columns_loaded,
                fetch_failed,
            },
        }
    }

    /// Returns the bound cache.
    pub fn cache(&self) -> &WindowedDataCache {
        &self.cache
    }

    /// Returns the bound view.
    pub fn view(&self) -> &Arc<V> {
        &self.view
    }

    /// Makes sure the rows the grid shows are loaded.
    pub fn viewport_changed(&self) {
        if let Some(window) = self.view.viewport() {
            self.cache.ensure_range(window.from, window.to);
        }
    }

    /// Re-sorts and reloads the visible rows.
    pub fn sort(&self, field: Option<&str>, ascending: bool) {
        self.cache.set_sort(field, ascending);
        self.viewport_changed();
    }

    /// Applies a search and reloads the visible rows.
    pub fn search(&self, text: impl Into<String>) {
        self.cache.set_search(text);
        self.viewport_changed();
    }

    /// Sets an extra request parameter without reloading.
    pub fn set_param(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.cache.set_param(key, value);
    }

    /// Switches the server-side view and reloads the visible rows.
    pub fn set_view(&self, view: impl Into<Value>) {
        self.cache.set_param("view", view);
        self.viewport_changed();
    }

    /// Drops all rows, re-requests columns and loads the first rows.
    pub fn reload(&self) {
        self.cache.clear();
        self.cache.invalidate_columns();
        self.cache.ensure_range(INITIAL_ROWS.from, INITIAL_ROWS.to);
    }
}

impl<V: GridView + 'static> Drop for GridBinding<V> {
    fn drop(&mut self) {
        let s = &self.subscriptions;
        self.cache.on_loading_started().unsubscribe(s.loading_started);
        self.cache.on_loaded().unsubscribe(s.loaded);
        self.cache.on_columns_loaded().unsubscribe(s.columns_loaded);
        self.cache.on_fetch_failed().unsubscribe(s.fetch_failed);
    }
}
