use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::HttpConfig;
use crate::error::LoaderError;

/// Fetches one page body.
///
/// Implementations report every failure (connection, non-2xx, undecodable
/// body) as an `Err`; the loader does not look further than success/failure.
/// Dropping the returned future must abort the request.
#[async_trait]
pub trait PageTransport: Send + Sync + std::fmt::Debug {
    async fn fetch_page(&self, url: &Url) -> Result<Value, LoaderError>;
}

/// reqwest-backed transport used against the REST API
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, LoaderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(standard_headers())
            .build()
            .map_err(|e| LoaderError::misconfigured(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

fn standard_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

#[async_trait]
impl PageTransport for HttpTransport {
    async fn fetch_page(&self, url: &Url) -> Result<Value, LoaderError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(LoaderError::from_reqwest)?;

        let status = response.status();
        debug!("Response: {} ({})", status, url);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());

            warn!("Error response - Status: {}, Body: {}", status.as_u16(), body);
            return Err(LoaderError::from_status(status.as_u16(), body));
        }

        let bytes = response.bytes().await.map_err(LoaderError::from_reqwest)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
