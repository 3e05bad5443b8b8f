//! HTTP transport backed by reqwest
//!
//! Session cookies set by the backend (access and refresh tokens) live in the
//! client's in-memory cookie jar and are sent back automatically, so the rest
//! of the crate never sees them.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::config::ApiSettings;
use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::ports::{ApiRequest, ApiResponse, HttpMethod, HttpTransport};

/// Storefront backend over HTTP
#[derive(Debug)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn map_request_error(&self, error: reqwest::Error) -> DomainError {
        if error.is_timeout() {
            DomainError::unreachable(format!(
                "Request timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            DomainError::unreachable(format!("Unable to connect to {}", self.base_url))
        } else {
            DomainError::unreachable(format!("Request failed: {}", error))
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn execute(&self, request: &ApiRequest) -> DomainResult<ApiResponse> {
        let url = self.url(&request.path);

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Patch => self.client.patch(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_request_error(e))?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| self.map_request_error(e))?;

        tracing::debug!(method = request.method.as_str(), %url, status, "response received");
        Ok(ApiResponse::new(status, ApiResponse::decode_body(&bytes)))
    }
}
