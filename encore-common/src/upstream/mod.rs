//! External catalog clients
//!
//! Both upstreams sit behind traits so services receive them as injected
//! `Arc<dyn ...>` handles and tests can substitute stubs.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::Result;

mod itunes;
mod soundcloud;

pub use itunes::ItunesCatalog;
pub use soundcloud::SoundCloudEmbed;

/// User agent sent to every upstream
pub const USER_AGENT: &str = concat!("Encore/", env!("CARGO_PKG_VERSION"));

/// Generic music catalog searched by free text
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Search song entities
    ///
    /// Returns the upstream JSON body unmodified. Transport failures and
    /// bodies that are not JSON are errors.
    async fn search(&self, term: &str, limit: u32) -> Result<Value>;
}

/// Social-audio provider resolving links to embed metadata
#[async_trait]
pub trait EmbedSource: Send + Sync {
    /// Look up embed metadata for a link
    ///
    /// `Ok(None)` when the provider answers with a non-success status.
    async fn oembed(&self, link: &str) -> Result<Option<OEmbed>>;
}

/// oEmbed response fields Encore reads
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OEmbed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Embeddable iframe snippet
    #[serde(default)]
    pub html: Option<String>,
}

/// Shared reqwest client for upstream calls
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}
