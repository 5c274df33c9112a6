//! Transport error types

use std::time::Duration;

/// Why a window of rows could not be delivered.
///
/// Reported through the cache's `FetchFailed` event; the cache itself never
/// returns these.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The grid endpoint rejected the window request.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status the endpoint answered with.
        status: u16,
        /// Response body as sent, usually the server's explanation.
        message: String,
    },

    /// The window request or its response was lost on the wire.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// No response arrived within the transport's timeout.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The configured grid endpoint is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The body was not `{ data: [...], total }`, or a row was not an object.
    #[error("Invalid window response: {message}")]
    Parse {
        /// What was wrong with the body.
        message: String,
        /// The body as received, when it was not JSON at all.
        body: Option<String>,
    },
}

impl TransportError {
    /// An error status from the endpoint.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// A response that does not follow the window contract.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: None,
        }
    }

    /// Like [`parse`](Self::parse), keeping the unparseable body.
    pub fn parse_with_body(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// Status the endpoint answered with, for [`Http`](Self::Http) errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if re-issuing the same window could succeed.
    ///
    /// The cache never retries on its own; callers use this to decide
    /// whether to call `ensure_range` again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Network(_) => true,
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}
