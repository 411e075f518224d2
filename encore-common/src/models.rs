//! Row models for the datastore tables
//!
//! Field names follow the column names so rows serialize to the JSON the
//! client already understands (`song_name`, `album_art_url`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of "top four" favorite slots per user
pub const FAVORITE_SLOTS: usize = 4;

/// Display name used when the gateway supplies none
pub const DEFAULT_USER_NAME: &str = "User";

/// A user's review of one track (table `posts`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub song_name: String,
    pub artist_name: String,
    pub album_art_url: String,
    pub preview_url: Option<String>,
    pub soundcloud_url: Option<String>,
    /// 0.5 .. 5.0 in half steps
    pub rating: f64,
    pub caption: String,
    pub created_at: DateTime<Utc>,
}

/// Review fields supplied by a writer; identity comes from the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub song_name: String,
    pub artist_name: String,
    #[serde(default)]
    pub album_art_url: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub soundcloud_url: Option<String>,
    pub rating: f64,
    #[serde(default)]
    pub caption: String,
}

impl ReviewDraft {
    /// Check the draft before it reaches the datastore
    ///
    /// Ratings are half-star steps between 0.5 and 5.0 inclusive.
    pub fn validate(&self) -> Result<(), String> {
        if self.song_name.trim().is_empty() {
            return Err("song_name is required".to_string());
        }
        if self.artist_name.trim().is_empty() {
            return Err("artist_name is required".to_string());
        }
        if !is_valid_rating(self.rating) {
            return Err(format!(
                "rating must be a half step between 0.5 and 5.0, got {}",
                self.rating
            ));
        }
        Ok(())
    }
}

/// True for 0.5, 1.0, 1.5, ... 5.0
pub fn is_valid_rating(rating: f64) -> bool {
    rating.is_finite() && (0.5..=5.0).contains(&rating) && (rating * 2.0).fract() == 0.0
}

/// Outcome of an upsert keyed by a conflict target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Upserted<T> {
    pub row: T,
    /// True when an existing row was replaced
    pub updated: bool,
}

/// Distinct reviewer found by name search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: String,
    pub user_name: String,
}

/// One "top four" slot (table `user_favorites`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub slot_number: i64,
    pub track_name: String,
    pub artist_name: String,
    pub image_url: String,
}

/// Favorite fields supplied by a writer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteDraft {
    pub track_name: String,
    pub artist_name: String,
    #[serde(default)]
    pub image_url: String,
}

/// Arrange favorites into their fixed slots, ignoring out-of-range slots
pub fn favorite_slots(favorites: Vec<Favorite>) -> [Option<Favorite>; FAVORITE_SLOTS] {
    let mut slots: [Option<Favorite>; FAVORITE_SLOTS] = Default::default();
    for favorite in favorites {
        if let Ok(index) = usize::try_from(favorite.slot_number) {
            if index < FAVORITE_SLOTS {
                slots[index] = Some(favorite);
            }
        }
    }
    slots
}

/// A user's playlist (table `playlists`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A track inside a playlist (table `playlist_items`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    pub playlist_id: String,
    pub song_name: String,
    pub artist_name: String,
    pub album_art_url: String,
    pub preview_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Track fields for a new playlist item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItemDraft {
    pub song_name: String,
    pub artist_name: String,
    #[serde(default)]
    pub album_art_url: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// A comment under a review (table `comments`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Public profile (table `profiles`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_name: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile write; `None` fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(rating: f64) -> ReviewDraft {
        ReviewDraft {
            song_name: "Blinding Lights".to_string(),
            artist_name: "The Weeknd".to_string(),
            rating,
            ..Default::default()
        }
    }

    #[test]
    fn test_half_step_ratings_accepted() {
        for rating in [0.5, 1.0, 2.5, 3.5, 5.0] {
            assert!(draft(rating).validate().is_ok(), "rating {}", rating);
        }
    }

    #[test]
    fn test_out_of_range_or_fractional_ratings_rejected() {
        for rating in [0.0, 0.25, 3.3, 5.5, -1.0, f64::NAN] {
            assert!(draft(rating).validate().is_err(), "rating {}", rating);
        }
    }

    #[test]
    fn test_blank_names_rejected() {
        let mut d = draft(4.0);
        d.song_name = "  ".to_string();
        assert!(d.validate().unwrap_err().contains("song_name"));

        let mut d = draft(4.0);
        d.artist_name = String::new();
        assert!(d.validate().unwrap_err().contains("artist_name"));
    }

    #[test]
    fn test_favorite_slots_placement() {
        let fav = |slot: i64| Favorite {
            user_id: "u1".to_string(),
            slot_number: slot,
            track_name: format!("track {}", slot),
            artist_name: "artist".to_string(),
            image_url: String::new(),
        };

        let slots = favorite_slots(vec![fav(2), fav(0), fav(7), fav(-1)]);

        assert_eq!(slots[0].as_ref().unwrap().track_name, "track 0");
        assert!(slots[1].is_none());
        assert_eq!(slots[2].as_ref().unwrap().track_name, "track 2");
        assert!(slots[3].is_none());
    }
}
