//! Shared test fixtures: an in-process table server and event recorders.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use gridwindow_lib::WindowedDataCache;
use gridwindow_lib::Window;
use gridwindow_lib::error::TransportError;
use gridwindow_lib::model::Row;
use gridwindow_lib::transport::FetchRequest;
use gridwindow_lib::transport::FetchResponse;
use gridwindow_lib::transport::Transport;
use serde_json::Value;
use serde_json::json;

/// Serves windows of a virtual table whose row `i` has `{"id": i}`.
///
/// Like many paging backends it also numbers rows within the page.
#[derive(Clone)]
pub struct TableServer {
    inner: Arc<TableServerInner>,
}

struct TableServerInner {
    total: AtomicUsize,
    max_batch: AtomicUsize,
    latency: Mutex<Duration>,
    failing: AtomicBool,
    requests: Mutex<Vec<FetchRequest>>,
}

impl TableServer {
    pub fn new(total: usize) -> Self {
        Self {
            inner: Arc::new(TableServerInner {
                total: AtomicUsize::new(total),
                max_batch: AtomicUsize::new(usize::MAX),
                latency: Mutex::new(Duration::ZERO),
                failing: AtomicBool::new(false),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn set_total(&self, total: usize) {
        self.inner.total.store(total, Ordering::SeqCst);
    }

    /// Caps the number of rows returned per request.
    pub fn set_max_batch(&self, rows: usize) {
        self.inner.max_batch.store(rows, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock().unwrap() = latency;
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn windows(&self) -> Vec<Window> {
        self.requests().iter().map(|r| r.window).collect()
    }
}

pub fn columns() -> Vec<Value> {
    vec![json!({"field": "id"}), json!({"field": "search"})]
}

#[async_trait]
impl Transport for TableServer {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        self.inner.requests.lock().unwrap().push(request.clone());

        let latency = *self.inner.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(TransportError::http(503, "unavailable"));
        }

        let total = self.inner.total.load(Ordering::SeqCst);
        let max_batch = self.inner.max_batch.load(Ordering::SeqCst);
        let window = request.window;
        let end = window
            .to
            .saturating_add(1)
            .min(total)
            .min(window.from.saturating_add(max_batch));

        let rows = (window.from..end)
            .map(|i| {
                Row::new()
                    .set("index", (i - window.from) as u64)
                    .set("id", i as u64)
                    .set("search", request.search.clone())
            })
            .collect();

        let mut response = FetchResponse::new(rows, total);
        if request.load_columns {
            response = response.with_columns(columns());
        }
        Ok(response)
    }
}

/// Collects every event a cache raises.
#[derive(Clone, Default)]
pub struct Recorder {
    pub loading_started: Arc<Mutex<Vec<Window>>>,
    pub loaded: Arc<Mutex<Vec<Window>>>,
    pub columns_loaded: Arc<Mutex<Vec<Vec<Value>>>>,
    pub failed: Arc<Mutex<Vec<(Window, Option<u16>)>>>,
}

impl Recorder {
    pub fn attach(cache: &WindowedDataCache) -> Self {
        let recorder = Self::default();

        let started = recorder.loading_started.clone();
        cache
            .on_loading_started()
            .subscribe(move |e| started.lock().unwrap().push(e.window));

        let loaded = recorder.loaded.clone();
        cache
            .on_loaded()
            .subscribe(move |e| loaded.lock().unwrap().push(e.window));

        let columns = recorder.columns_loaded.clone();
        cache
            .on_columns_loaded()
            .subscribe(move |e| columns.lock().unwrap().push(e.columns.to_vec()));

        let failed = recorder.failed.clone();
        cache.on_fetch_failed().subscribe(move |e| {
            failed
                .lock()
                .unwrap()
                .push((e.window, e.error.status_code()))
        });

        recorder
    }

    pub fn loading_started(&self) -> Vec<Window> {
        self.loading_started.lock().unwrap().clone()
    }

    pub fn loaded(&self) -> Vec<Window> {
        self.loaded.lock().unwrap().clone()
    }

    pub fn columns_loaded(&self) -> Vec<Vec<Value>> {
        self.columns_loaded.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<(Window, Option<u16>)> {
        self.failed.lock().unwrap().clone()
    }
}

pub fn window(from: usize, to: usize) -> Window {
    Window::new(from, to).unwrap()
}

/// Lets debounce timers fire and in-flight fetches complete.
///
/// Tests run with a paused clock, so this only advances virtual time.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}
