//! Windowed, server-backed row cache
//!
//! Loads only the rows of a virtual table that a grid is about to show,
//! batching and debouncing requests to a server that reports the table's
//! total length with every page.

pub mod cache;
pub mod error;
pub mod event;
pub mod grid;
pub mod model;
pub mod query;
pub mod transport;

pub use cache::CacheConfig;
pub use cache::WindowedDataCache;
pub use cache::Window;
pub use error::Error;
