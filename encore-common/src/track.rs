//! Unified track records and catalog result helpers
//!
//! Search results arrive in two shapes: native catalog objects passed through
//! by the search proxy, and the synthetic social-audio object it builds from
//! an oEmbed lookup. Both carry `trackId`, `trackName`, `artistName` and
//! `artworkUrl100`, which is what [`Track::from_result`] reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Substrings that mark a query as a social-audio link
pub const SOCIAL_AUDIO_MARKERS: [&str; 2] = ["soundcloud.com/", "on.soundcloud.com/"];

/// Redirect-shortened social-audio links
pub const SHORT_LINK_MARKER: &str = "on.soundcloud.com/";

/// Prefix of synthetic social-audio track identifiers
pub const SOCIAL_ID_PREFIX: &str = "sc-";

/// Artist shown when the provider reports no author
pub const SOCIAL_ARTIST_FALLBACK: &str = "SoundCloud Artist";

/// Cover shown for social-audio tracks without a thumbnail
pub const SOCIAL_ARTWORK_PLACEHOLDER: &str =
    "https://images.unsplash.com/photo-1470225620780-dba8ba36b745?w=200&h=200&fit=crop";

/// True when the query should be resolved as a social-audio link
pub fn is_social_audio_link(query: &str) -> bool {
    SOCIAL_AUDIO_MARKERS.iter().any(|m| query.contains(m))
}

/// Where a track record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    Catalog,
    SocialAudio,
}

/// Result object the search proxy emits for a resolved social-audio link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialAudioResult {
    pub soundcloud_data: bool,
    #[serde(rename = "trackId")]
    pub track_id: String,
    #[serde(rename = "trackName")]
    pub track_name: String,
    #[serde(rename = "artistName")]
    pub artist_name: String,
    #[serde(rename = "artworkUrl100")]
    pub artwork_url100: String,
    #[serde(rename = "soundcloudUrl")]
    pub soundcloud_url: String,
}

/// Lenient view of one catalog search result
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTrack {
    pub track_id: Option<i64>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    #[serde(rename = "artworkUrl100")]
    pub artwork_url100: Option<String>,
    pub preview_url: Option<String>,
    pub track_time_millis: Option<u64>,
    pub release_date: Option<String>,
    pub primary_genre_name: Option<String>,
    pub collection_name: Option<String>,
    pub track_view_url: Option<String>,
}

impl CatalogTrack {
    /// First entry of a search response's `results` array
    pub fn first_of(response: &Value) -> Option<Self> {
        response
            .get("results")?
            .as_array()?
            .first()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Unified track record shown in search lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// High resolution cover for catalog tracks, placeholder for bare social-audio tracks
    pub album_cover: String,
    pub preview_url: Option<String>,
    pub soundcloud_url: Option<String>,
    pub source: TrackSource,
}

impl Track {
    /// Build a track from one element of a search response
    ///
    /// Returns `None` when the element has no title.
    pub fn from_result(value: &Value) -> Option<Self> {
        let title = value.get("trackName")?.as_str()?.to_string();
        let is_social = value
            .get("soundcloud_data")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let id = match value.get("trackId") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let artist = str_field(value, "artistName").unwrap_or_default();
        let artwork = str_field(value, "artworkUrl100").unwrap_or_default();

        let (album_cover, source) = if is_social {
            let cover = if artwork.is_empty() {
                SOCIAL_ARTWORK_PLACEHOLDER.to_string()
            } else {
                artwork
            };
            (cover, TrackSource::SocialAudio)
        } else {
            (high_res_artwork(&artwork), TrackSource::Catalog)
        };

        Some(Self {
            id,
            title,
            artist,
            album_cover,
            preview_url: str_field(value, "previewUrl"),
            soundcloud_url: str_field(value, "soundcloudUrl"),
            source,
        })
    }

    /// Map every usable element of a `{"results": [...]}` response
    pub fn from_response(response: &Value) -> Vec<Self> {
        response
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().filter_map(Self::from_result).collect())
            .unwrap_or_default()
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Swap the catalog's 100px artwork for the 600px rendition
///
/// Only the first size marker is rewritten.
pub fn high_res_artwork(url: &str) -> String {
    url.replacen("100x100", "600x600", 1)
}

/// Descriptive extras shown on the track detail view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackExtras {
    pub year: String,
    pub genre: String,
    pub duration: String,
    pub album: String,
    pub apple_music_url: Option<String>,
    pub spotify_url: String,
    pub preview_url: Option<String>,
}

impl TrackExtras {
    /// Placeholders used until (or unless) the catalog knows the track
    pub fn placeholder(artist: &str, title: &str) -> Self {
        Self {
            year: "----".to_string(),
            genre: "Music".to_string(),
            duration: "--:--".to_string(),
            album: "their latest project".to_string(),
            apple_music_url: None,
            spotify_url: spotify_search_url(artist, title),
            preview_url: None,
        }
    }

    /// Fill the placeholders from a catalog match
    pub fn from_catalog(artist: &str, title: &str, track: Option<&CatalogTrack>) -> Self {
        let mut extras = Self::placeholder(artist, title);
        let Some(track) = track else {
            return extras;
        };

        if let Some(year) = track.release_date.as_deref().and_then(release_year) {
            extras.year = year.to_string();
        }
        if let Some(genre) = track.primary_genre_name.as_ref().filter(|g| !g.is_empty()) {
            extras.genre = genre.clone();
        }
        if let Some(millis) = track.track_time_millis {
            extras.duration = format_duration(millis);
        }
        if let Some(album) = track.collection_name.as_ref().filter(|a| !a.is_empty()) {
            extras.album = album.clone();
        }
        extras.apple_music_url = track.track_view_url.clone();
        extras.preview_url = track.preview_url.clone();
        extras
    }
}

/// `m:ss`, rounding to the nearest second
pub fn format_duration(millis: u64) -> String {
    let total_secs = (millis + 500) / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Year of an ISO-8601 release date such as `2019-11-29T12:00:00Z`
pub fn release_year(date: &str) -> Option<i32> {
    use chrono::Datelike;

    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(date) {
        return Some(parsed.year());
    }
    date.get(..4).and_then(|y| y.parse().ok())
}

/// Spotify search page for a track
pub fn spotify_search_url(artist: &str, title: &str) -> String {
    format!(
        "https://open.spotify.com/search/{}",
        urlencoding::encode(&format!("{} {}", artist, title))
    )
}
