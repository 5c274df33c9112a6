//! Configuration error types

/// Errors raised while validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The optimal batch size must be at least one row.
    #[error("optimal batch size must be greater than zero")]
    ZeroBatchSize,

    /// The request span limit must be at least one row.
    #[error("max window must be greater than zero")]
    ZeroMaxWindow,

    /// The columns key was set to an empty string.
    #[error("columns key must not be empty")]
    EmptyColumnsKey,
}
