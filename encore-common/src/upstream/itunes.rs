//! iTunes Search API client

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::CatalogSource;
use crate::{Error, Result};

/// Catalog search against `{base_url}/search`
pub struct ItunesCatalog {
    http_client: reqwest::Client,
    base_url: String,
}

impl ItunesCatalog {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CatalogSource for ItunesCatalog {
    async fn search(&self, term: &str, limit: u32) -> Result<Value> {
        let url = format!("{}/search", self.base_url);
        let limit = limit.to_string();

        debug!(term = %term, url = %url, "Querying catalog search");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("term", term),
                ("media", "music"),
                ("entity", "song"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // The body is passed through whatever the status; only JSON is required
        let value: Value = serde_json::from_str(&body).map_err(|e| {
            Error::Upstream(format!("Catalog returned non-JSON body (HTTP {}): {}", status, e))
        })?;

        debug!(status = %status, "Catalog search answered");
        Ok(value)
    }
}
