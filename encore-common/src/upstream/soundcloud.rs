//! SoundCloud oEmbed client

use async_trait::async_trait;
use tracing::debug;

use super::{EmbedSource, OEmbed};
use crate::Result;

/// Embed metadata lookup against `{base_url}/oembed`
pub struct SoundCloudEmbed {
    http_client: reqwest::Client,
    base_url: String,
}

impl SoundCloudEmbed {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmbedSource for SoundCloudEmbed {
    async fn oembed(&self, link: &str) -> Result<Option<OEmbed>> {
        let url = format!("{}/oembed", self.base_url);

        debug!(link = %link, "Querying oEmbed");

        let response = self
            .http_client
            .get(&url)
            .query(&[("url", link), ("format", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "oEmbed lookup rejected");
            return Ok(None);
        }

        let embed: OEmbed = response.json().await?;
        Ok(Some(embed))
    }
}
