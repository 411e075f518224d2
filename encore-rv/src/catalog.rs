//! Track lookups for the review service
//!
//! Catalog queries either go straight to the catalog or through the search
//! proxy, chosen once at startup by `direct_upstream_access`. Social-audio
//! links always take the proxy route since only the proxy resolves them.

use async_trait::async_trait;
use encore_common::track::{is_social_audio_link, CatalogTrack, Track, TrackExtras};
use encore_common::upstream::CatalogSource;
use encore_common::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Results requested for a direct catalog search
pub const DIRECT_SEARCH_LIMIT: u32 = 10;

/// Search proxy (`encore-sp`) seen as a catalog
///
/// The proxy fixes its own result limit, so `limit` is not forwarded.
pub struct ProxyCatalog {
    http_client: reqwest::Client,
    base_url: String,
}

impl ProxyCatalog {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CatalogSource for ProxyCatalog {
    async fn search(&self, term: &str, _limit: u32) -> Result<Value> {
        let url = format!("{}/api/search", self.base_url);
        debug!(term = %term, url = %url, "Querying search proxy");

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", term)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!("Search proxy returned HTTP {}", status)));
        }
        Ok(response.json().await?)
    }
}

/// Route selection between the catalog and the proxy
pub struct TrackLookup {
    /// Set when `direct_upstream_access` is on
    direct: Option<Arc<dyn CatalogSource>>,
    proxy: Arc<dyn CatalogSource>,
}

impl TrackLookup {
    pub fn new(direct: Option<Arc<dyn CatalogSource>>, proxy: Arc<dyn CatalogSource>) -> Self {
        Self { direct, proxy }
    }

    pub fn is_direct(&self) -> bool {
        self.direct.is_some()
    }

    fn route(&self, query: &str) -> &Arc<dyn CatalogSource> {
        match &self.direct {
            Some(direct) if !is_social_audio_link(query) => direct,
            _ => &self.proxy,
        }
    }

    /// Tracks matching a free-text query or link
    pub async fn search(&self, query: &str) -> Result<Vec<Track>> {
        let body = self.route(query).search(query, DIRECT_SEARCH_LIMIT).await?;
        Ok(Track::from_response(&body))
    }

    /// Catalog details for a reviewed track
    ///
    /// Lookup failures degrade to placeholders; the detail view still renders.
    pub async fn extras(&self, title: &str, artist: &str) -> TrackExtras {
        let query = format!("{} {}", artist, title);
        match self.route(&query).search(&query, 1).await {
            Ok(body) => TrackExtras::from_catalog(artist, title, CatalogTrack::first_of(&body).as_ref()),
            Err(e) => {
                debug!(error = %e, title, artist, "Track details unavailable");
                TrackExtras::placeholder(artist, title)
            }
        }
    }
}
