use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::debug;

use crate::error::{AppError, AppResult, HttpError};

use super::types::{ApiRequest, ApiResponse, HttpMethod};

pub const DEFAULT_USER_AGENT: &str = concat!("twist-loadtest/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,
    #[error("Request failed: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Failed(err.to_string())
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and read the full response body.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be sent or the body cannot be
    /// read. HTTP error statuses are not errors.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Transport over a single shared `reqwest` client and connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base: String,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns an error when the host is not an absolute http(s) URL or the
    /// client cannot be built.
    pub fn new(host: &str, timeout: Duration) -> AppResult<Self> {
        let parsed = Url::parse(host).map_err(|err| {
            AppError::http(HttpError::InvalidHost {
                url: host.to_owned(),
                source: err,
            })
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::http(HttpError::UnsupportedScheme {
                url: host.to_owned(),
            }));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))?;
        Ok(Self {
            client,
            base: host.trim_end_matches('/').to_owned(),
        })
    }

    /// Absolute URL for a request path; paths are appended to the host as-is.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        if let Some(token) = request.bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!(
            "{} {} -> {} ({} bytes)",
            request.method,
            request.path,
            status,
            body.len()
        );
        Ok(ApiResponse::new(status, body))
    }
}
