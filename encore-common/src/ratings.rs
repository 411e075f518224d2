//! Rating aggregation for the track detail view
//!
//! The aggregate is derived from the current review set every time it is
//! requested; nothing here is cached or stored.

use serde::Serialize;

use crate::models::Review;

/// Number of whole-star histogram buckets (1..=5 stars)
pub const HISTOGRAM_BUCKETS: usize = 5;

/// Average and per-star distribution for one track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingAggregate {
    /// Mean rating with one decimal ("0.0" when there are no reviews)
    pub average: String,
    /// Review count per whole star; index 0 is one star
    pub histogram: [u32; HISTOGRAM_BUCKETS],
    /// Largest bucket, never below 1 so it can scale bar heights
    pub max_bucket: u32,
    /// Number of reviews matching the track
    pub review_count: usize,
}

/// Reviews whose title and artist match exactly (case-sensitive)
pub fn reviews_for_track<'a>(
    reviews: &'a [Review],
    title: &'a str,
    artist: &'a str,
) -> impl Iterator<Item = &'a Review> + 'a {
    reviews
        .iter()
        .filter(move |r| r.song_name == title && r.artist_name == artist)
}

/// Compute the aggregate for `(title, artist)` over all known reviews
pub fn aggregate(reviews: &[Review], title: &str, artist: &str) -> RatingAggregate {
    let ratings: Vec<f64> = reviews_for_track(reviews, title, artist)
        .map(|r| r.rating)
        .collect();

    let histogram = histogram(&ratings);
    let max_bucket = histogram.iter().copied().max().unwrap_or(0).max(1);

    RatingAggregate {
        average: average(&ratings),
        histogram,
        max_bucket,
        review_count: ratings.len(),
    }
}

/// Mean rendered to one decimal
///
/// Rounds the exact binary value of the mean, with exact ties going up:
/// 1.15 is stored just below 1.15 and renders "1.1", while 1.25 is exact
/// and renders "1.3".
pub fn average(ratings: &[f64]) -> String {
    if ratings.is_empty() {
        return "0.0".to_string();
    }
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    if is_exact_tie(mean) {
        // mean * 10 is exact here (a multiple of 2.5)
        format!("{:.1}", (mean * 10.0 + 0.5).floor() / 10.0)
    } else {
        format!("{:.1}", mean)
    }
}

/// True when `value` sits exactly halfway between two one-decimal values
///
/// A binary float can only equal `k + 0.05 * odd` when that is also a
/// multiple of 0.25, so the ties are exactly the odd quarters.
fn is_exact_tie(value: f64) -> bool {
    let quarters = value * 4.0;
    quarters.fract() == 0.0 && quarters.rem_euclid(2.0) == 1.0
}

/// Per-star counts
///
/// Only whole-star ratings in [1, 5] are counted; half-star ratings such as
/// 3.5 fall into no bucket.
pub fn histogram(ratings: &[f64]) -> [u32; HISTOGRAM_BUCKETS] {
    let mut buckets = [0u32; HISTOGRAM_BUCKETS];
    for &rating in ratings {
        if rating.fract() == 0.0 && (1.0..=5.0).contains(&rating) {
            buckets[rating as usize - 1] += 1;
        }
    }
    buckets
}

/// The review `user_id` left on `(title, artist)`, if any
pub fn user_review<'a>(
    reviews: &'a [Review],
    title: &str,
    artist: &str,
    user_id: &str,
) -> Option<&'a Review> {
    reviews
        .iter()
        .find(|r| r.song_name == title && r.artist_name == artist && r.user_id == user_id)
}
