//! REST transport
//!
//! [`RestTransport`] is the seam between typed endpoint methods and the
//! network: one call is one HTTP round trip returning the decoded JSON body.
//! [`HttpTransport`] is the reqwest implementation used against a live
//! controller. No retries are performed at this layer.

use async_trait::async_trait;
use fl_core::{ControllerConfig, Error, Result};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Executes a single HTTP request against the controller
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// Send `method path?query` with an optional JSON body.
    ///
    /// Returns `Ok(None)` when the controller answers with an empty body
    /// (e.g. `204 No Content`).
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Option<Value>>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the configured controller
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut req = self.client.request(method, &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::transport(format!("{}: {}", url, e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::transport(format!("{}: failed to read body: {}", url, e)))?;

        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            debug!("{} returned {} with empty body", path, status);
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::malformed(path, e.to_string()))
    }
}
