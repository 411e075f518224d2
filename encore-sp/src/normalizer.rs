//! Query normalization across the catalog and the social-audio provider
//!
//! A query that looks like a social-audio link is resolved through the
//! provider's oEmbed lookup; everything else, and every failed lookup, goes to
//! the catalog search.

use encore_common::track::{
    is_social_audio_link, SocialAudioResult, SHORT_LINK_MARKER, SOCIAL_ARTIST_FALLBACK,
    SOCIAL_ID_PREFIX,
};
use encore_common::upstream::{CatalogSource, EmbedSource, OEmbed};
use encore_common::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Catalog results requested per search
pub const RESULT_LIMIT: u32 = 20;

/// What a search resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// A link resolved through oEmbed
    SocialAudio(SocialAudioResult),
    /// Catalog response body, untouched
    Catalog(Value),
}

impl SearchOutcome {
    /// Response body sent to the client
    pub fn into_body(self) -> Value {
        match self {
            SearchOutcome::SocialAudio(result) => json!({ "results": [result] }),
            SearchOutcome::Catalog(body) => body,
        }
    }
}

pub struct SearchNormalizer {
    catalog: Arc<dyn CatalogSource>,
    embed: Arc<dyn EmbedSource>,
}

impl SearchNormalizer {
    pub fn new(catalog: Arc<dyn CatalogSource>, embed: Arc<dyn EmbedSource>) -> Self {
        Self { catalog, embed }
    }

    /// Resolve a non-empty query
    ///
    /// Only catalog failures are errors. At most two upstream calls are made,
    /// one after the other.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        if is_social_audio_link(query) {
            info!(link = %query, "Resolving social-audio link");
            if let Some(result) = self.resolve_link(query).await {
                return Ok(SearchOutcome::SocialAudio(result));
            }
            debug!(link = %query, "Link lookup failed, searching catalog instead");
        }

        let body = self.catalog.search(query, RESULT_LIMIT).await?;
        Ok(SearchOutcome::Catalog(body))
    }

    async fn resolve_link(&self, link: &str) -> Option<SocialAudioResult> {
        let oembed = match self.embed.oembed(link).await {
            Ok(Some(oembed)) => oembed,
            Ok(None) => {
                debug!(link = %link, "Provider rejected link");
                return None;
            }
            Err(e) => {
                warn!(link = %link, error = %e, "Social-audio lookup failed");
                return None;
            }
        };
        social_audio_result(link, oembed, chrono::Utc::now().timestamp_millis())
    }
}

/// Map an oEmbed response onto the result shape clients expect
///
/// `None` when the provider returned no title.
pub fn social_audio_result(link: &str, oembed: OEmbed, millis: i64) -> Option<SocialAudioResult> {
    let title = oembed.title.filter(|t| !t.is_empty())?;

    let mut soundcloud_url = link.to_string();
    if link.contains(SHORT_LINK_MARKER) {
        if let Some(expanded) = oembed.html.as_deref().and_then(embedded_track_url) {
            debug!(short = %link, full = %expanded, "Expanded short link");
            soundcloud_url = expanded;
        }
    }

    Some(SocialAudioResult {
        soundcloud_data: true,
        track_id: format!("{}{}", SOCIAL_ID_PREFIX, millis),
        track_name: title,
        artist_name: oembed
            .author_name
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| SOCIAL_ARTIST_FALLBACK.to_string()),
        artwork_url100: oembed.thumbnail_url.unwrap_or_default(),
        soundcloud_url,
    })
}

/// Percent-decoded `url=` parameter of an embed player iframe
///
/// The value runs up to the next `&` or `"`.
pub fn embedded_track_url(html: &str) -> Option<String> {
    let start = html.find("url=")? + "url=".len();
    let rest = &html[start..];
    let end = rest.find(['&', '"']).unwrap_or(rest.len());
    let encoded = &rest[..end];
    if encoded.is_empty() {
        return None;
    }
    urlencoding::decode(encoded).ok().map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oembed(title: Option<&str>) -> OEmbed {
        OEmbed {
            title: title.map(str::to_string),
            author_name: Some("Night Owl".to_string()),
            thumbnail_url: Some("https://i1.sndcdn.com/art-t500x500.jpg".to_string()),
            html: None,
        }
    }

    #[test]
    fn test_full_link_mapping() {
        let link = "https://soundcloud.com/night-owl/drive";
        let result = social_audio_result(link, oembed(Some("Drive")), 1_700_000_000_000).unwrap();

        assert!(result.soundcloud_data);
        assert_eq!(result.track_id, "sc-1700000000000");
        assert_eq!(result.track_name, "Drive");
        assert_eq!(result.artist_name, "Night Owl");
        assert_eq!(result.artwork_url100, "https://i1.sndcdn.com/art-t500x500.jpg");
        assert_eq!(result.soundcloud_url, link);
    }

    #[test]
    fn test_missing_author_and_thumbnail() {
        let mut data = oembed(Some("Drive"));
        data.author_name = None;
        data.thumbnail_url = None;

        let result = social_audio_result("https://soundcloud.com/x/y", data, 1).unwrap();

        assert_eq!(result.artist_name, "SoundCloud Artist");
        assert_eq!(result.artwork_url100, "");
    }

    #[test]
    fn test_missing_title_rejected() {
        assert!(social_audio_result("https://soundcloud.com/x/y", oembed(None), 1).is_none());
        assert!(social_audio_result("https://soundcloud.com/x/y", oembed(Some("")), 1).is_none());
    }

    #[test]
    fn test_short_link_expanded_from_iframe() {
        let mut data = oembed(Some("Drive"));
        data.html = Some(
            "<iframe src=\"https://w.soundcloud.com/player/?visual=true&url=https%3A%2F%2Fapi.soundcloud.com%2Ftracks%2F123&show_artwork=true\"></iframe>"
                .to_string(),
        );

        let result = social_audio_result("https://on.soundcloud.com/AbC12", data, 1).unwrap();

        assert_eq!(result.soundcloud_url, "https://api.soundcloud.com/tracks/123");
    }

    #[test]
    fn test_full_link_not_rewritten() {
        let mut data = oembed(Some("Drive"));
        data.html = Some("<iframe src=\"https://w.soundcloud.com/player/?url=https%3A%2F%2Fother\"></iframe>".to_string());

        let link = "https://soundcloud.com/night-owl/drive";
        let result = social_audio_result(link, data, 1).unwrap();

        assert_eq!(result.soundcloud_url, link);
    }

    #[test]
    fn test_embedded_url_extraction() {
        assert_eq!(
            embedded_track_url("src=\"x?url=https%3A%2F%2Fa.b%2Fc\"").as_deref(),
            Some("https://a.b/c")
        );
        assert_eq!(
            embedded_track_url("x?url=abc&y=1").as_deref(),
            Some("abc")
        );
        assert!(embedded_track_url("<iframe></iframe>").is_none());
        assert!(embedded_track_url("url=&x").is_none());
    }

    #[test]
    fn test_social_body_wraps_single_result() {
        let result = social_audio_result("https://soundcloud.com/x/y", oembed(Some("T")), 5).unwrap();
        let body = SearchOutcome::SocialAudio(result).into_body();

        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["soundcloud_data"], true);
        assert_eq!(results[0]["trackId"], "sc-5");
    }
}
