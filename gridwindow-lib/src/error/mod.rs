//! Error types

mod config;
mod transport;

pub use config::*;
pub use transport::*;

/// Top-level error for fallible gridwindow operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fetch could not be completed by the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The cache or transport configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
