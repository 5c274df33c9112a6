//! HTTP transport over reqwest

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use url::Url;

use super::FetchRequest;
use super::FetchResponse;
use super::Transport;
use crate::error::ConfigError;
use crate::error::Error;
use crate::error::TransportError;

/// Transport that POSTs window requests as JSON to a single endpoint.
///
/// Cheap to clone (uses `Arc` internally).
///
/// # Example
///
/// ```ignore
/// use gridwindow_lib::transport::HttpTransport;
///
/// let transport = HttpTransport::builder()
///     .endpoint("https://example.com/grid/accounts")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

struct HttpTransportInner {
    endpoint: Url,
    columns_key: String,
    headers: HeaderMap,
    bearer_token: Option<String>,
    http_client: Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Creates a new builder for constructing a transport.
    pub fn builder() -> HttpTransportBuilder<Missing> {
        HttpTransportBuilder::new()
    }

    /// Returns the endpoint requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Returns the response key column metadata is read from.
    pub fn columns_key(&self) -> &str {
        &self.inner.columns_key
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("columns_key", &self.inner.columns_key)
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        let inner = &self.inner;
        let mut builder = inner
            .http_client
            .post(inner.endpoint.clone())
            .headers(inner.headers.clone())
            .json(&request.to_body());

        if let Some(token) = &inner.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = inner.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(TransportError::http(status.as_u16(), body));
        }

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| TransportError::parse_with_body(e.to_string(), body.clone()))?;

        FetchResponse::from_json(json, &inner.columns_key)
    }
}

impl HttpTransport {
    fn map_send_error(&self, error: reqwest::Error) -> TransportError {
        match self.inner.timeout {
            Some(timeout) if error.is_timeout() => TransportError::Timeout(timeout),
            _ => TransportError::Network(error),
        }
    }
}

// =============================================================================
// Typestate Builder
// =============================================================================

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing an [`HttpTransport`].
///
/// The endpoint is required; `build` is only available once it is set.
pub struct HttpTransportBuilder<Endpoint> {
    endpoint: Endpoint,
    columns_key: String,
    headers: HeaderMap,
    bearer_token: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    http_client: Option<Client>,
}

impl HttpTransportBuilder<Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            endpoint: Missing,
            columns_key: "columns".to_string(),
            headers: HeaderMap::new(),
            bearer_token: None,
            timeout: None,
            connect_timeout: None,
            http_client: None,
        }
    }

    /// Sets the endpoint URL window requests are POSTed to.
    pub fn endpoint(self, url: impl Into<String>) -> HttpTransportBuilder<Set<String>> {
        HttpTransportBuilder {
            endpoint: Set(url.into()),
            columns_key: self.columns_key,
            headers: self.headers,
            bearer_token: self.bearer_token,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            http_client: self.http_client,
        }
    }
}

impl Default for HttpTransportBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> HttpTransportBuilder<E> {
    /// Sets the response key holding column metadata.
    ///
    /// Defaults to `columns`.
    pub fn columns_key(mut self, key: impl Into<String>) -> Self {
        self.columns_key = key.into();
        self
    }

    /// Adds a header sent with every request.
    ///
    /// Invalid header names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Sets a bearer token sent with every request.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// This is applied when building the HTTP client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets a custom HTTP client.
    ///
    /// If not set, a default client will be created.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

impl HttpTransportBuilder<Set<String>> {
    /// Builds the [`HttpTransport`].
    pub fn build(self) -> Result<HttpTransport, Error> {
        let endpoint = Url::parse(&self.endpoint.0)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", self.endpoint.0, e)))?;

        if self.columns_key.is_empty() {
            return Err(ConfigError::EmptyColumnsKey.into());
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                builder.build().map_err(TransportError::from)?
            }
        };

        Ok(HttpTransport {
            inner: Arc::new(HttpTransportInner {
                endpoint,
                columns_key: self.columns_key,
                headers: self.headers,
                bearer_token: self.bearer_token,
                http_client,
                timeout: self.timeout,
            }),
        })
    }
}
