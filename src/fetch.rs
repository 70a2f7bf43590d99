//! Network fetch seam
//!
//! Everything that issues a request goes through the `Fetcher` trait.
//! `HttpFetcher` performs real requests with reqwest and buffers the whole
//! body into a `ResponseSnapshot` before handing it back.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderValue;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::cache::{RequestDescriptor, ResponseSnapshot, StoreError};

/// User agent sent with every network request
const USER_AGENT: &str = concat!("stalecache/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when fetching a response
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response cache failed while serving the request
    #[error("Response cache failed: {0}")]
    Cache(#[from] StoreError),

    /// Any other failure reported by a fetcher implementation
    #[error("{0}")]
    Other(String),
}

/// Something that can turn a request into a buffered response
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, FetchError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, FetchError> {
        (**self).fetch(request).await
    }
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher whose requests fail after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, FetchError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let url = response.url().clone();
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), header_value(v)))
            .collect();
        let body = response.bytes().await?;

        debug!(url = %url, status = status.as_u16(), bytes = body.len(), "fetched response");

        Ok(ResponseSnapshot {
            url,
            status,
            headers,
            body,
            fetched_at: Utc::now(),
        })
    }
}

/// Header values are text; bytes outside UTF-8 are kept lossily
fn header_value(value: &HeaderValue) -> String {
    match value.to_str() {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
    }
}
