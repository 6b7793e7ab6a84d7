//! HTTP seam between the controller and the chat backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder as ReqwestRequest};
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Status and body of a settled HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl HttpReply {
    /// Creates a reply.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves requests to the backend.
///
/// Implementations report network-level failures as errors; any HTTP status,
/// success or not, is a successful [`HttpReply`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `body` as JSON to `url`.
    async fn post_json(&self, url: &Url, body: &Value) -> Result<HttpReply>;

    /// GETs `url`.
    async fn get(&self, url: &Url) -> Result<HttpReply>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<HttpReply> {
        (**self).post_json(url, body).await
    }

    async fn get(&self, url: &Url) -> Result<HttpReply> {
        (**self).get(url).await
    }
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::transport(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self { client, timeout })
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    async fn execute(&self, request: ReqwestRequest) -> Result<HttpReply> {
        let response = request
            .headers(Self::default_headers())
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;
        Ok(HttpReply { status, body })
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(Some(self.timeout.as_secs_f64()))
        } else {
            Error::transport(e.to_string(), Some(Box::new(e)))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<HttpReply> {
        tracing::debug!(%url, "POST");
        self.execute(self.client.post(url.clone()).json(body)).await
    }

    async fn get(&self, url: &Url) -> Result<HttpReply> {
        tracing::debug!(%url, "GET");
        self.execute(self.client.get(url.clone())).await
    }
}
