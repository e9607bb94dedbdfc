//! # Compatibility Calculator
//!
//! Scores how well two listeners' tastes line up and explains the score.
//!
//! ## Algorithm
//!
//! Nine component similarities, each in `[0, 1]`, combined with fixed
//! weights:
//!
//! | Component | Source | Weight |
//! |---|---|---|
//! | genre | TF-IDF over de-duplicated genres | 0.20 |
//! | artist | TF-IDF over top-artist names/ids | 0.20 |
//! | track | TF-IDF over top-track names/ids | 0.15 |
//! | energy | `1 - |a - b|` on normalised scores | 0.07 |
//! | danceability | same | 0.07 |
//! | diversity | same | 0.07 |
//! | obscurity | same | 0.07 |
//! | decade | TF-IDF over favorite decades | 0.07 |
//! | listening pattern | cosine of 24-hour play histograms | 0.10 |
//!
//! ## Score Scale
//!
//! Profiles store metrics on 0-100. They are divided by 100 and clamped to
//! `[0, 1]` here, so numeric similarities can never leave `[0, 1]`. A score
//! that was never computed reads as the neutral 50; a non-finite score is
//! rejected with [`EngineError::NonFiniteScore`].
//!
//! Two empty profiles therefore score exactly the four numeric weights,
//! `0.28`: thin data is weak evidence, not zero compatibility.

use crate::error::{EngineError, Result};
use crate::profile::{ArtistRef, MusicProfile};
use crate::similarity::{calculate_text_similarity, listening_pattern_similarity, numeric_similarity};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Weight of each component in the overall score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentWeights {
    pub genre: f64,
    pub artist: f64,
    pub track: f64,
    pub energy: f64,
    pub danceability: f64,
    pub diversity: f64,
    pub obscurity: f64,
    pub decade: f64,
    pub listening_pattern: f64,
}

/// The fixed weights. They sum to 1.0.
pub const WEIGHTS: ComponentWeights = ComponentWeights {
    genre: 0.20,
    artist: 0.20,
    track: 0.15,
    energy: 0.07,
    danceability: 0.07,
    diversity: 0.07,
    obscurity: 0.07,
    decade: 0.07,
    listening_pattern: 0.10,
};

impl ComponentWeights {
    /// Weights in component order
    #[must_use]
    pub const fn as_array(&self) -> [f64; 9] {
        [
            self.genre,
            self.artist,
            self.track,
            self.energy,
            self.danceability,
            self.diversity,
            self.obscurity,
            self.decade,
            self.listening_pattern,
        ]
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

/// Score stored on a profile whose metrics were never computed
const NEUTRAL_STORED_SCORE: f64 = 50.0;

/// Per-dimension similarities, each in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSimilarities {
    pub genre_similarity: f64,
    pub artist_similarity: f64,
    pub track_similarity: f64,
    pub energy_similarity: f64,
    pub danceability_similarity: f64,
    pub diversity_similarity: f64,
    pub obscurity_similarity: f64,
    pub decade_similarity: f64,
    pub listening_pattern_similarity: f64,
}

/// Component names in the order used everywhere
pub const COMPONENT_NAMES: [&str; 9] = [
    "genre_similarity",
    "artist_similarity",
    "track_similarity",
    "energy_similarity",
    "danceability_similarity",
    "diversity_similarity",
    "obscurity_similarity",
    "decade_similarity",
    "listening_pattern_similarity",
];

impl ComponentSimilarities {
    /// Values in component order
    #[must_use]
    pub const fn as_array(&self) -> [f64; 9] {
        [
            self.genre_similarity,
            self.artist_similarity,
            self.track_similarity,
            self.energy_similarity,
            self.danceability_similarity,
            self.diversity_similarity,
            self.obscurity_similarity,
            self.decade_similarity,
            self.listening_pattern_similarity,
        ]
    }

    /// Weighted sum in fixed component order
    #[must_use]
    pub fn weighted_sum(&self, weights: &ComponentWeights) -> f64 {
        self.as_array()
            .iter()
            .zip(weights.as_array())
            .map(|(similarity, weight)| similarity * weight)
            .sum()
    }
}

/// One line of an auditable score breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentContribution {
    pub name: &'static str,
    pub similarity: f64,
    pub weight: f64,
}

impl ComponentContribution {
    /// Share of the overall score this component accounts for
    #[must_use]
    pub fn contribution(&self) -> f64 {
        self.similarity * self.weight
    }
}

/// Artists, tracks and genres that appear on both profiles, sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMusic {
    pub artists: Vec<String>,
    pub tracks: Vec<String>,
    pub genres: Vec<String>,
}

/// Compatibility of two profiles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    /// Weighted sum of the components, in `[0, 1]`
    pub overall_similarity: f64,
    pub component_similarities: ComponentSimilarities,
    pub shared_music: SharedMusic,
}

impl CompatibilityResult {
    /// Overall score as a whole percentage, truncated, as stored on a
    /// connection record.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(&self) -> u8 {
        (self.overall_similarity * 100.0).clamp(0.0, 100.0) as u8
    }

    /// Component breakdown with weights, in component order
    #[must_use]
    pub fn named_components(&self) -> Vec<ComponentContribution> {
        COMPONENT_NAMES
            .iter()
            .zip(self.component_similarities.as_array())
            .zip(WEIGHTS.as_array())
            .map(|((&name, similarity), weight)| ComponentContribution {
                name,
                similarity,
                weight,
            })
            .collect()
    }
}

/// Bring a stored 0-100 score onto `[0, 1]`.
///
/// # Errors
///
/// [`EngineError::NonFiniteScore`] for NaN or infinite input.
pub fn normalized_score(field: &'static str, score: Option<f64>) -> Result<f64> {
    let value = score.unwrap_or(NEUTRAL_STORED_SCORE);
    if !value.is_finite() {
        return Err(EngineError::NonFiniteScore { field, value });
    }
    Ok((value / 100.0).clamp(0.0, 1.0))
}

fn metric_similarity(
    field: &'static str,
    left: Option<f64>,
    right: Option<f64>,
) -> Result<f64> {
    Ok(numeric_similarity(
        normalized_score(field, left)?,
        normalized_score(field, right)?,
    ))
}

/// Items present in both lists, de-duplicated and sorted
fn intersection<'a>(
    left: impl Iterator<Item = &'a str>,
    right: impl Iterator<Item = &'a str>,
) -> Vec<String> {
    let right: HashSet<&str> = right.collect();
    left.filter(|item| right.contains(item))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Artist ids, track ids and genres the two profiles have in common.
///
/// Display only; it does not feed the score.
#[must_use]
pub fn shared_music(left: &MusicProfile, right: &MusicProfile) -> SharedMusic {
    SharedMusic {
        artists: intersection(
            left.top_artists.iter().map(ArtistRef::id),
            right.top_artists.iter().map(ArtistRef::id),
        ),
        tracks: intersection(
            left.top_tracks.iter().map(|t| t.id()),
            right.top_tracks.iter().map(|t| t.id()),
        ),
        genres: intersection(
            left.genres.iter().map(String::as_str),
            right.genres.iter().map(String::as_str),
        ),
    }
}

/// Weighted compatibility of two profiles with a per-component breakdown.
///
/// Symmetric: swapping the arguments gives the same scores.
///
/// # Errors
///
/// [`EngineError::NonFiniteScore`] if either profile holds a NaN or
/// infinite metric.
///
/// # Examples
///
/// ```
/// use tunematch::compatibility::calculate_overall_similarity;
/// use tunematch::profile::MusicProfile;
///
/// let empty = calculate_overall_similarity(&MusicProfile::new("a"), &MusicProfile::new("b"))?;
/// assert!((empty.overall_similarity - 0.28).abs() < 1e-9);
/// # Ok::<(), tunematch::error::EngineError>(())
/// ```
pub fn calculate_overall_similarity(
    left: &MusicProfile,
    right: &MusicProfile,
) -> Result<CompatibilityResult> {
    let artist_keys = |p: &MusicProfile| -> Vec<String> {
        p.top_artists.iter().map(|a| a.similarity_key().to_string()).collect()
    };
    let track_keys = |p: &MusicProfile| -> Vec<String> {
        p.top_tracks.iter().map(|t| t.similarity_key().to_string()).collect()
    };

    let components = ComponentSimilarities {
        genre_similarity: calculate_text_similarity(&left.unique_genres(), &right.unique_genres()),
        artist_similarity: calculate_text_similarity(&artist_keys(left), &artist_keys(right)),
        track_similarity: calculate_text_similarity(&track_keys(left), &track_keys(right)),
        energy_similarity: metric_similarity("energy_score", left.energy_score, right.energy_score)?,
        danceability_similarity: metric_similarity(
            "danceability_score",
            left.danceability_score,
            right.danceability_score,
        )?,
        diversity_similarity: metric_similarity(
            "diversity_score",
            left.diversity_score,
            right.diversity_score,
        )?,
        obscurity_similarity: metric_similarity(
            "obscurity_score",
            left.obscurity_score,
            right.obscurity_score,
        )?,
        decade_similarity: calculate_text_similarity(&left.favorite_decades, &right.favorite_decades),
        listening_pattern_similarity: listening_pattern_similarity(
            left.listening_history.as_ref(),
            right.listening_history.as_ref(),
        ),
    };

    let overall_similarity = components.weighted_sum(&WEIGHTS);
    debug!(
        "Compatibility {} <-> {}: {overall_similarity:.4} {components:?}",
        left.user_id, right.user_id
    );

    Ok(CompatibilityResult {
        overall_similarity,
        component_similarities: components,
        shared_music: shared_music(left, right),
    })
}

/// Overlap of two listeners' top artists and their genres
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutualInterests {
    /// Artists of the other listener that the first also has, in the other's order
    pub mutual_artists: Vec<ArtistRef>,
    /// Genres carried by both listeners' artists, sorted
    pub mutual_genres: Vec<String>,
    /// `mutual items / (first listener's artists + genres) × 100`, 2 decimals
    pub compatibility_score: f64,
}

/// Quick overlap summary of two top-artist lists.
///
/// A lighter measure than [`calculate_overall_similarity`], meant for "you
/// both like..." displays.
#[must_use]
pub fn mutual_interests(user_artists: &[ArtistRef], other_artists: &[ArtistRef]) -> MutualInterests {
    let user_ids: HashSet<&str> = user_artists.iter().map(ArtistRef::id).collect();
    let mutual_artists: Vec<ArtistRef> = other_artists
        .iter()
        .filter(|artist| user_ids.contains(artist.id()))
        .cloned()
        .collect();

    let genres_of = |artists: &[ArtistRef]| -> BTreeSet<String> {
        artists
            .iter()
            .flat_map(|artist| artist.genres().iter().cloned())
            .collect()
    };
    let user_genres = genres_of(user_artists);
    let other_genres = genres_of(other_artists);
    let mutual_genres: Vec<String> = user_genres.intersection(&other_genres).cloned().collect();

    let total_items = user_artists.len() + user_genres.len();
    let mutual_items = mutual_artists.len() + mutual_genres.len();
    #[allow(clippy::cast_precision_loss)]
    let compatibility_score = if total_items == 0 {
        0.0
    } else {
        let raw = mutual_items as f64 / total_items as f64 * 100.0;
        (raw * 100.0).round() / 100.0
    };

    MutualInterests {
        mutual_artists,
        mutual_genres,
        compatibility_score,
    }
}
