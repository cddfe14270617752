//! HTTP request/response exchange.
//!
//! A single [`HttpClient::execute`] call performs one exchange. There is no
//! retry or redirect policy at this layer; callers decide what to do with
//! non-2xx statuses.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered header multimap. Names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Creates an empty header set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a header, keeping any existing values for `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of header entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }
}

/// An outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebRequest {
    /// Absolute URL.
    pub url: String,
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// Request headers.
    pub headers: Headers,
    /// Request body; empty for none.
    pub body: String,
}

impl WebRequest {
    /// A `GET` request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            ..Self::default()
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }
}

/// A received response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebResponse {
    /// Numeric status code.
    pub status_code: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: String,
}

impl WebResponse {
    /// Returns `true` for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }
}

/// Transport-level failures. A response with any status is not an error.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request URL could not be parsed.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// The request method is not a valid HTTP token.
    #[error("Invalid HTTP method: '{0}'")]
    InvalidMethod(String),

    /// Connecting, sending or receiving failed.
    #[error("HTTP transport failed: {0}")]
    Transport(String),

    /// The client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    ClientInit(String),
}

/// Performs one HTTP exchange.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends `request` and returns the response, whatever its status.
    async fn execute(&self, request: &WebRequest) -> Result<WebResponse, HttpError>;
}

/// Creates [`HttpClient`] instances.
pub trait HttpClientFactory: Send + Sync {
    /// Creates a fresh client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::ClientInit`] if the client cannot be built.
    fn create_instance(&self) -> Result<Box<dyn HttpClient>, HttpError>;
}

impl fmt::Debug for dyn HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HttpClient")
    }
}

#[cfg(feature = "http-client")]
pub use self::reqwest_client::{ReqwestHttpClient, ReqwestHttpClientFactory};

#[cfg(feature = "http-client")]
mod reqwest_client {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{Headers, HttpClient, HttpClientFactory, HttpError, WebRequest, WebResponse};

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// [`HttpClient`] backed by `reqwest`.
    #[derive(Debug, Clone)]
    pub struct ReqwestHttpClient {
        client: reqwest::Client,
    }

    impl ReqwestHttpClient {
        /// Builds a client with a request timeout.
        ///
        /// # Errors
        ///
        /// Returns [`HttpError::ClientInit`] if the TLS backend fails to
        /// initialize.
        pub fn new(timeout: Duration) -> Result<Self, HttpError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| HttpError::ClientInit(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HttpClient for ReqwestHttpClient {
        async fn execute(&self, request: &WebRequest) -> Result<WebResponse, HttpError> {
            let url = url::Url::parse(&request.url).map_err(|e| HttpError::InvalidUrl {
                url: request.url.clone(),
                message: e.to_string(),
            })?;
            let method = reqwest::Method::from_bytes(request.method.as_bytes())
                .map_err(|_| HttpError::InvalidMethod(request.method.clone()))?;

            let mut builder = self.client.request(method, url);
            for (name, value) in request.headers.iter() {
                builder = builder.header(name, value);
            }
            if !request.body.is_empty() {
                builder = builder.body(request.body.clone());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?;

            let status = response.status();
            let headers: Headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?;

            Ok(WebResponse {
                status_code: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
            })
        }
    }

    /// Creates [`ReqwestHttpClient`]s sharing one timeout.
    #[derive(Debug, Clone, Copy)]
    pub struct ReqwestHttpClientFactory {
        timeout: Duration,
    }

    impl ReqwestHttpClientFactory {
        /// Factory whose clients use `timeout`.
        #[must_use]
        pub const fn new(timeout: Duration) -> Self {
            Self { timeout }
        }
    }

    impl Default for ReqwestHttpClientFactory {
        fn default() -> Self {
            Self::new(DEFAULT_TIMEOUT)
        }
    }

    impl HttpClientFactory for ReqwestHttpClientFactory {
        fn create_instance(&self) -> Result<Box<dyn HttpClient>, HttpError> {
            Ok(Box::new(ReqwestHttpClient::new(self.timeout)?))
        }
    }
}
