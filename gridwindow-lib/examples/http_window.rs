//! Loads a few windows of a remote grid and prints them.
//!
//! Run with: cargo run --example http_window
//!
//! Requires .env file with:
//! - GRID_URL
//!
//! Optional:
//! - GRID_TOKEN (sent as a bearer token)
//! - GRID_SEARCH

use std::env;
use std::fs::File;
use std::time::Duration;

use gridwindow_lib::CacheConfig;
use gridwindow_lib::WindowedDataCache;
use gridwindow_lib::query::QueryState;
use gridwindow_lib::transport::HttpTransport;
use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::WriteLogger;
use tokio::sync::Notify;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let log_file = File::create("http_window.log")?;
    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)?;

    let url = env::var("GRID_URL").expect("GRID_URL not set");

    let mut builder = HttpTransport::builder()
        .endpoint(url)
        .timeout(Duration::from_secs(30));
    if let Ok(token) = env::var("GRID_TOKEN") {
        builder = builder.bearer_token(token);
    }
    let transport = builder.build()?;

    let query = QueryState::new().with_search(env::var("GRID_SEARCH").unwrap_or_default());
    let cache = WindowedDataCache::new(transport, CacheConfig::default().with_query(query))?;

    let done = std::sync::Arc::new(Notify::new());
    {
        let done = done.clone();
        cache.on_loaded().subscribe(move |loaded| {
            println!("Loaded {}", loaded.window);
            done.notify_one();
        });
    }
    {
        let done = done.clone();
        cache.on_fetch_failed().subscribe(move |failed| {
            println!("Fetch for {} failed: {}", failed.window, failed.error);
            done.notify_one();
        });
    }
    cache.on_columns_loaded().subscribe(|columns| {
        println!("{} columns", columns.columns.len());
    });

    for (from, to) in [(0, 20), (40, 42), (500, 530)] {
        if cache.is_range_loaded(from, to) {
            println!("[{}, {}] already loaded", from, to);
            continue;
        }
        cache.ensure_range(from, to);
        done.notified().await;

        println!("Total rows: {}", cache.len());
        for row in cache.rows(from, to.min(from + 4)) {
            println!("  {:>5}: {}", row.index(), serde_json::Value::Object(row.into_fields()));
        }
    }

    Ok(())
}
