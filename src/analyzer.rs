//! # Profile Metric Analyzer
//!
//! Turns raw provider data into the taste metrics stored on a profile:
//!
//! - **Favorite decades**: release years bucketed by decade, weighted by
//!   `popularity / 50`, top three
//! - **Listening patterns**: hour, weekday, genre and track histograms plus
//!   the most recent plays
//! - **Energy / danceability**: mean audio feature × 100
//! - **Diversity**: genre breadth, artist-genre breadth and audio-feature
//!   spread, averaged
//! - **Obscurity**: inverse popularity of artists and tracks plus the share
//!   of mainstream artists
//!
//! Every scorer falls back to a neutral value when its input is missing,
//! never to zero: 50 for scores and means, 0.5 for ratios. Rows that cannot
//! be parsed are skipped, not reported.
//!
//! The scoring functions are pure. [`ProfileAnalyzer::sync`] is the only
//! part doing I/O: it pulls a bounded window from a [`MusicProvider`] and
//! lets any [`ProviderError`] through unchanged, since a half-refreshed
//! profile would skew later comparisons.

use crate::config::SyncPolicy;
use crate::error::{ProviderError, Result};
use crate::profile::{
    ArtistDetails, ArtistRef, ListeningPatterns, Metrics, ProfileSync, RankedCounts, RecentPlay,
    TrackDetails, TrackRef,
};
use crate::provider::{AudioFeatures, MusicProvider, PlayHistoryItem, RawArtist, RawTrack};
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use log::{debug, info, trace, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::thread;

/// Neutral score used when there is nothing to measure
pub const NEUTRAL_SCORE: u8 = 50;

/// Popularity assumed for a track or artist the provider gives none for
const DEFAULT_POPULARITY: u32 = 50;

/// Artists above this popularity count as mainstream
pub const MAINSTREAM_THRESHOLD: u32 = 70;

const TOP_DECADES: usize = 3;
const TOP_HISTOGRAM_ENTRIES: usize = 10;
const RECENT_PLAYS_KEPT: usize = 20;

/// Unique genres at which genre diversity saturates
const GENRE_DIVERSITY_CAP: f64 = 30.0;
/// Unique artist genres at which artist diversity saturates
const ARTIST_GENRE_DIVERSITY_CAP: f64 = 50.0;
/// Maps a typical audio-feature standard deviation (0-0.3) onto 0-100
const FEATURE_SPREAD_SCALE: f64 = 333.0;

/// Integer counter that remembers first-seen order, so ties rank stably.
#[derive(Debug, Default)]
struct Tally {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, key: &str, weight: u64) {
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1 += weight,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), weight));
            }
        }
    }

    /// Heaviest `n` entries; equal weights keep first-seen order.
    fn most_common(mut self, n: usize) -> Vec<(String, u64)> {
        self.entries.sort_by(|(_, a), (_, b)| b.cmp(a));
        self.entries.truncate(n);
        self.entries
    }

    fn into_counts(entries: Vec<(String, u64)>) -> RankedCounts {
        RankedCounts::new(
            entries
                .into_iter()
                .map(|(key, count)| (key, u32::try_from(count).unwrap_or(u32::MAX)))
                .collect(),
        )
    }
}

/// Decade label for a release date, e.g. `"1985-01-01"` gives `"80s"`.
///
/// Only the leading four-digit year is read; anything else yields `None`.
/// Labels carry no century, so 1905 and 2005 both land in `"00s"`.
#[must_use]
pub fn decade_label(release_date: &str) -> Option<String> {
    let year = release_date.get(..4)?;
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: u32 = year.parse().ok()?;
    Some(format!("{:02}s", (year % 100) / 10 * 10))
}

/// Top three decades by popularity-weighted track count.
///
/// Each track weighs `popularity / 50`. Decades are ranked on summed integer
/// popularity, which orders them the same way without float rounding, so
/// equal weights always keep first-seen order. Tracks without a parseable
/// release year are ignored; a track with no popularity counts as 50.
#[must_use]
pub fn favorite_decades(tracks: &[RawTrack]) -> Vec<String> {
    let mut decades = Tally::default();

    for track in tracks {
        let Some(label) = track
            .album
            .as_ref()
            .and_then(|album| album.release_date.as_deref())
            .and_then(decade_label)
        else {
            trace!("Skipping track {} without usable release date", track.id);
            continue;
        };

        let popularity = track.popularity.unwrap_or(DEFAULT_POPULARITY);
        decades.add(&label, u64::from(popularity));
    }

    decades
        .most_common(TOP_DECADES)
        .into_iter()
        .map(|(decade, _)| decade)
        .collect()
}

/// Parsed `played_at` timestamp
struct PlayedAt {
    hour: u8,
    weekday: String,
    instant: DateTime<Utc>,
}

/// Reads RFC 3339 timestamps in their own offset; offset-less timestamps are
/// taken as UTC.
fn parse_played_at(raw: &str) -> Option<PlayedAt> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(PlayedAt {
            hour: u8::try_from(stamp.hour()).ok()?,
            weekday: stamp.format("%A").to_string(),
            instant: stamp.with_timezone(&Utc),
        });
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Some(PlayedAt {
        hour: u8::try_from(naive.hour()).ok()?,
        weekday: naive.format("%A").to_string(),
        instant: naive.and_utc(),
    })
}

/// Build listening-pattern histograms from recently played events.
///
/// `artist_genres` resolves an artist id to its genres. Its errors abort the
/// analysis and are returned as-is.
///
/// # Errors
///
/// Propagates the first failure of `artist_genres`.
pub fn listening_patterns<F>(
    events: &[PlayHistoryItem],
    mut artist_genres: F,
) -> std::result::Result<ListeningPatterns, ProviderError>
where
    F: FnMut(&str) -> std::result::Result<Vec<String>, ProviderError>,
{
    let mut by_hour = BTreeMap::new();
    let mut by_day = Tally::default();
    let mut by_genre = Tally::default();
    let mut most_played = Tally::default();
    let mut recent = Vec::new();

    for event in events {
        let (Some(raw_stamp), Some(track)) = (event.played_at.as_deref(), event.track.as_ref())
        else {
            trace!("Skipping play event without timestamp or track");
            continue;
        };
        let Some(played_at) = parse_played_at(raw_stamp) else {
            trace!("Skipping play event with unparseable timestamp {raw_stamp:?}");
            continue;
        };

        *by_hour.entry(played_at.hour).or_insert(0) += 1;
        by_day.add(&played_at.weekday, 1);

        if !track.id.is_empty() {
            most_played.add(&track.id, 1);
        }

        let artist = track.primary_artist();
        if let Some(artist_id) = artist.and_then(|a| a.id.as_deref()) {
            for genre in artist_genres(artist_id)? {
                by_genre.add(&genre, 1);
            }
        }

        recent.push((
            played_at.instant,
            RecentPlay {
                id: Some(track.id.clone()).filter(|id| !id.is_empty()),
                name: Some(track.name.clone()).filter(|name| !name.is_empty()),
                artist: artist.and_then(|a| a.name.clone()),
                played_at: raw_stamp.to_string(),
            },
        ));
    }

    // newest first; stable for equal timestamps
    recent.sort_by(|(a, _), (b, _)| b.cmp(a));
    recent.truncate(RECENT_PLAYS_KEPT);

    Ok(ListeningPatterns {
        by_hour,
        by_day: Tally::into_counts(by_day.entries),
        by_genre: Tally::into_counts(by_genre.most_common(TOP_HISTOGRAM_ENTRIES)),
        most_played: Tally::into_counts(most_played.most_common(TOP_HISTOGRAM_ENTRIES)),
        recent_tracks: recent.into_iter().map(|(_, play)| play).collect(),
    })
}

/// Mean of one feature across tracks, as a 0-100 score.
fn mean_feature_score<F>(features: &[Option<AudioFeatures>], pick: F) -> u8
where
    F: Fn(&AudioFeatures) -> Option<f64>,
{
    let values: Vec<f64> = features
        .iter()
        .flatten()
        .filter_map(&pick)
        .filter(|value| value.is_finite())
        .collect();

    if values.is_empty() {
        return NEUTRAL_SCORE;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = values.iter().map(|value| value * 100.0).sum::<f64>() / values.len() as f64;
    truncate_score(mean)
}

/// Truncate a 0-100 value to an integer score.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn truncate_score(value: f64) -> u8 {
    value.clamp(0.0, 100.0) as u8
}

/// Average energy of the tracks, 0-100; 50 without data.
#[must_use]
pub fn energy_score(features: &[Option<AudioFeatures>]) -> u8 {
    mean_feature_score(features, |f| f.energy)
}

/// Average danceability of the tracks, 0-100; 50 without data.
#[must_use]
pub fn danceability_score(features: &[Option<AudioFeatures>]) -> u8 {
    mean_feature_score(features, |f| f.danceability)
}

/// Sample standard deviation; `None` below two values.
fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Spread of the audio features across tracks, 0-100.
fn feature_spread(features: &[Option<AudioFeatures>]) -> f64 {
    let rows: Vec<&AudioFeatures> = features.iter().flatten().collect();
    if rows.is_empty() {
        return f64::from(NEUTRAL_SCORE);
    }

    let pickers: [fn(&AudioFeatures) -> Option<f64>; 4] = [
        |f| f.tempo,
        |f| f.energy,
        |f| f.valence,
        |f| f.danceability,
    ];

    let spreads: Vec<f64> = pickers
        .iter()
        .map(|pick| {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| pick(row))
                .filter(|v| v.is_finite())
                .collect();
            sample_std_dev(&values)
                .map_or(f64::from(NEUTRAL_SCORE), |sd| (sd * FEATURE_SPREAD_SCALE).min(100.0))
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let mean = spreads.iter().sum::<f64>() / spreads.len() as f64;
    mean
}

/// Breadth of a listener's taste, 0-100.
///
/// Unweighted mean of genre diversity, artist-genre diversity and
/// audio-feature spread, each capped at 100.
#[must_use]
pub fn diversity_score(
    genres: &[String],
    artists: &[RawArtist],
    features: &[Option<AudioFeatures>],
) -> u8 {
    #[allow(clippy::cast_precision_loss)]
    let unique_genres = genres.iter().collect::<HashSet<_>>().len() as f64;
    let genre_score = (unique_genres / GENRE_DIVERSITY_CAP * 100.0).min(100.0);

    #[allow(clippy::cast_precision_loss)]
    let artist_genres = artists
        .iter()
        .flat_map(|artist| &artist.genres)
        .collect::<HashSet<_>>()
        .len() as f64;
    let artist_score = (artist_genres / ARTIST_GENRE_DIVERSITY_CAP * 100.0).min(100.0);

    let feature_score = feature_spread(features);

    trace!("Diversity parts: genre {genre_score:.1}, artist {artist_score:.1}, features {feature_score:.1}");
    truncate_score((genre_score + artist_score + feature_score) / 3.0)
}

fn inverse_popularity_mean(popularities: impl Iterator<Item = Option<u32>>) -> f64 {
    let scores: Vec<f64> = popularities
        .map(|p| 100.0 - f64::from(p.unwrap_or(DEFAULT_POPULARITY).min(100)))
        .collect();
    if scores.is_empty() {
        return f64::from(NEUTRAL_SCORE);
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean
}

/// How far from the mainstream a listener's taste sits, 0-100.
///
/// `0.4 × artist obscurity + 0.4 × track obscurity + 0.2 × (100 − 100 ×
/// mainstream ratio)`, where the ratio is the share of artists above
/// [`MAINSTREAM_THRESHOLD`] popularity (0.5 with no artists).
#[must_use]
pub fn obscurity_score(artists: &[RawArtist], tracks: &[RawTrack]) -> u8 {
    let artist_obscurity = inverse_popularity_mean(artists.iter().map(|a| a.popularity));
    let track_obscurity = inverse_popularity_mean(tracks.iter().map(|t| t.popularity));

    let mainstream_ratio = if artists.is_empty() {
        0.5
    } else {
        let mainstream = artists
            .iter()
            .filter(|a| a.popularity.unwrap_or(0) > MAINSTREAM_THRESHOLD)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = mainstream as f64 / artists.len() as f64;
        ratio
    };
    let mainstream_score = 100.0 - mainstream_ratio * 100.0;

    truncate_score(artist_obscurity * 0.4 + track_obscurity * 0.4 + mainstream_score * 0.2)
}

/// Genres across the artists, most frequent first, ties in first-seen order.
#[must_use]
pub fn rank_genres(artists: &[RawArtist]) -> Vec<String> {
    let mut genres = Tally::default();
    for genre in artists.iter().flat_map(|artist| &artist.genres) {
        genres.add(genre, 1);
    }
    genres
        .most_common(usize::MAX)
        .into_iter()
        .map(|(genre, _)| genre)
        .collect()
}

/// Runs a full profile sync against one provider
pub struct ProfileAnalyzer<'a, P: MusicProvider + ?Sized> {
    provider: &'a P,
    fetch_limit: usize,
}

impl<'a, P: MusicProvider + ?Sized> ProfileAnalyzer<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P, policy: &SyncPolicy) -> Self {
        Self {
            provider,
            fetch_limit: policy.effective_fetch_limit(),
        }
    }

    /// Fetch fresh data and derive everything a sync replaces on a profile.
    ///
    /// Makes one call each for top tracks, top artists, recent plays and
    /// audio features, plus one artist lookup per distinct artist in the
    /// recent plays that is not already among the top artists.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Upstream`](crate::error::EngineError::Upstream)
    /// with the provider's error on the first failed call.
    pub fn sync(&self) -> Result<ProfileSync> {
        let top_tracks = self.provider.top_tracks(self.fetch_limit)?;
        let top_artists = self.provider.top_artists(self.fetch_limit)?;
        let recent = self.provider.recently_played(self.fetch_limit)?;
        debug!(
            "Fetched {} top tracks, {} top artists, {} recent plays",
            top_tracks.len(),
            top_artists.len(),
            recent.len()
        );

        let track_ids: Vec<String> = top_tracks
            .iter()
            .filter(|track| !track.id.is_empty())
            .map(|track| track.id.clone())
            .collect();
        let features = if track_ids.is_empty() {
            Vec::new()
        } else {
            self.provider.audio_features(&track_ids)?
        };

        let mut genre_cache: HashMap<String, Vec<String>> = top_artists
            .iter()
            .map(|artist| (artist.id.clone(), artist.genres.clone()))
            .collect();
        let patterns = listening_patterns(&recent, |artist_id| {
            if let Some(genres) = genre_cache.get(artist_id) {
                return Ok(genres.clone());
            }
            let genres = self.provider.artist(artist_id)?.genres;
            genre_cache.insert(artist_id.to_string(), genres.clone());
            Ok(genres)
        })?;

        let genres = rank_genres(&top_artists);
        let all_genres: Vec<String> = top_artists
            .iter()
            .flat_map(|artist| artist.genres.iter().cloned())
            .collect();

        let metrics = Metrics {
            energy_score: energy_score(&features),
            danceability_score: danceability_score(&features),
            diversity_score: diversity_score(&all_genres, &top_artists, &features),
            obscurity_score: obscurity_score(&top_artists, &top_tracks),
            favorite_decades: favorite_decades(&top_tracks),
            listening_patterns: patterns,
        };
        info!(
            "Profile metrics: energy {}, danceability {}, diversity {}, obscurity {}, decades {:?}",
            metrics.energy_score,
            metrics.danceability_score,
            metrics.diversity_score,
            metrics.obscurity_score,
            metrics.favorite_decades
        );

        Ok(ProfileSync {
            top_artists: top_artists.into_iter().map(artist_ref).collect(),
            top_tracks: top_tracks.into_iter().map(track_ref).collect(),
            genres,
            metrics,
        })
    }
}

fn artist_ref(artist: RawArtist) -> ArtistRef {
    ArtistRef::Detailed(ArtistDetails {
        id: artist.id,
        name: artist.name,
        genres: artist.genres,
        popularity: artist.popularity,
    })
}

fn track_ref(track: RawTrack) -> TrackRef {
    let artist = track.primary_artist().and_then(|a| a.name.clone());
    TrackRef::Detailed(TrackDetails {
        id: track.id,
        name: track.name,
        popularity: track.popularity,
        artist,
        album: track.album.and_then(|album| album.name),
        genres: Vec::new(),
    })
}

/// [`ProfileAnalyzer::sync`] with retries on transient upstream failures.
///
/// Non-retryable errors, and the last retryable one, are returned unchanged.
///
/// # Errors
///
/// Whatever the final attempt failed with.
pub fn sync_with_retry<P: MusicProvider + ?Sized>(
    provider: &P,
    policy: &SyncPolicy,
) -> Result<ProfileSync> {
    let analyzer = ProfileAnalyzer::new(provider, policy);
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match analyzer.sync() {
            Ok(sync) => return Ok(sync),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                warn!("Sync attempt {attempt}/{max_attempts} failed: {err}; retrying in {delay:?}");
                thread::sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
