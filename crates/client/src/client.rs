//! Dashboard API client.
//!
//! Every call is a stateless read of one complete collection. Responses are
//! never cached: the client sends `Cache-Control: no-store` and keeps no
//! state between calls.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL};
use serde_json::Value;
use url::Url;

use todo_dashboard_core::{Collection, CollectionSource, TransportError};

use crate::error::{ClientError, Result};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the dashboard read API.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    client: reqwest::Client,
    base_url: Url,
}

impl DashboardClient {
    /// Create a new client with the default timeout.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The backend base URL (e.g., "http://localhost:3000")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(Self::headers())
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of a collection endpoint.
    pub fn collection_url(&self, collection: Collection) -> Result<Url> {
        self.base_url
            .join(&collection.path())
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        debug!("API response ({}): {} byte(s)", status, body.len());

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("Request failed: {}", body));
            return Err(ClientError::api(status.as_u16(), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!("Failed to deserialize response body: {}", e);
            ClientError::Json(e)
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collections
    // ─────────────────────────────────────────────────────────────────────────

    /// Read one whole collection as raw JSON records.
    ///
    /// GET /dashboard/{collection}
    pub async fn get_collection(&self, collection: Collection) -> Result<Vec<Value>> {
        let url = self.collection_url(collection)?;
        debug!("Fetching {} from {}", collection, url);

        let response = self.client.get(url).send().await?;

        Self::parse_response(response).await
    }
}

#[async_trait]
impl CollectionSource for DashboardClient {
    async fn fetch_collection(
        &self,
        collection: Collection,
    ) -> std::result::Result<Vec<Value>, TransportError> {
        self.get_collection(collection)
            .await
            .map_err(|e| e.into_transport(collection))
    }
}

/// Normalizes the base URL so relative joins append to its path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            raw,
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
