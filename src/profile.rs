//! # Music Profile Data Model
//!
//! Plain value types exchanged with the surrounding application:
//!
//! - [`MusicProfile`] - a user's taste snapshot, read by the calculator
//! - [`Metrics`] - derived scores written back after a sync
//! - [`ProfileSync`] - everything a sync replaces on a profile
//!
//! Profiles are snapshots. The calculator only ever borrows them and never
//! holds a reference to live storage, so callers fetch, release their store,
//! then compute.
//!
//! Top artists and tracks arrive either as bare identifiers or as detailed
//! provider objects; both shapes deserialize into the same tagged types.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Reference to an artist in a profile's top list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtistRef {
    /// Bare provider identifier (or name, for legacy rows)
    Id(String),
    /// Full provider object
    Detailed(ArtistDetails),
}

/// Provider artist object as stored on a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: Option<u32>,
}

impl ArtistRef {
    /// Identifier used for shared-music extraction.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Detailed(artist) => &artist.id,
        }
    }

    /// Text fed to the similarity primitive.
    #[must_use]
    pub fn similarity_key(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Detailed(artist) => &artist.name,
        }
    }

    /// Genres carried by the reference; empty for bare identifiers.
    #[must_use]
    pub fn genres(&self) -> &[String] {
        match self {
            Self::Id(_) => &[],
            Self::Detailed(artist) => &artist.genres,
        }
    }
}

/// Reference to a track in a profile's top list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackRef {
    Id(String),
    Detailed(TrackDetails),
}

/// Provider track object as stored on a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl TrackRef {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Detailed(track) => &track.id,
        }
    }

    #[must_use]
    pub fn similarity_key(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Detailed(track) => &track.name,
        }
    }
}

/// Ordered `key -> count` histogram.
///
/// Serializes as a JSON object but keeps entry order, which carries meaning
/// for the truncated top-N histograms (highest count first, ties in
/// first-seen order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedCounts(Vec<(String, u32)>);

impl RankedCounts {
    #[must_use]
    pub fn new(entries: Vec<(String, u32)>) -> Self {
        Self(entries)
    }

    /// Count for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u32> {
        self.0.iter().find(|(k, _)| k == key).map(|&(_, count)| count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, count)| (k.as_str(), *count))
    }

    /// Keys in stored order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RankedCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RankedCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RankedCountsVisitor;

        impl<'de> Visitor<'de> for RankedCountsVisitor {
            type Value = RankedCounts;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of string keys to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, count)) = access.next_entry::<String, u32>()? {
                    entries.push((key, count));
                }
                Ok(RankedCounts(entries))
            }
        }

        deserializer.deserialize_map(RankedCountsVisitor)
    }
}

/// One entry of the recent-plays list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentPlay {
    pub id: Option<String>,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub played_at: String,
}

/// Listening-pattern summary built from recently played events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListeningPatterns {
    /// Plays per hour of day, 0-23
    pub by_hour: BTreeMap<u8, u32>,
    /// Plays per weekday name, first-seen order
    pub by_day: RankedCounts,
    /// Top 10 genres
    pub by_genre: RankedCounts,
    /// Top 10 track ids
    pub most_played: RankedCounts,
    /// Up to 20 most recent plays, newest first
    pub recent_tracks: Vec<RecentPlay>,
}

impl ListeningPatterns {
    /// The by-hour histogram as a dense 24-slot vector, zero-filled.
    #[must_use]
    pub fn hour_vector(&self) -> [f64; 24] {
        let mut slots = [0.0; 24];
        for (&hour, &count) in &self.by_hour {
            if let Some(slot) = slots.get_mut(usize::from(hour)) {
                *slot = f64::from(count);
            }
        }
        slots
    }
}

/// A user's music taste snapshot.
///
/// Created empty alongside the user and overwritten wholesale by each sync.
/// Scores are on the 0-100 storage scale; `None` means "never computed" and
/// reads as the neutral midpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicProfile {
    pub user_id: String,
    pub genres: Vec<String>,
    pub top_artists: Vec<ArtistRef>,
    pub top_tracks: Vec<TrackRef>,
    pub favorite_decades: Vec<String>,
    pub energy_score: Option<f64>,
    pub danceability_score: Option<f64>,
    pub diversity_score: Option<f64>,
    pub obscurity_score: Option<f64>,
    pub listening_history: Option<ListeningPatterns>,
}

impl MusicProfile {
    /// Empty profile for a freshly created user.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Genres with duplicates removed, first occurrence kept.
    #[must_use]
    pub fn unique_genres(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.genres
            .iter()
            .map(String::as_str)
            .filter(|genre| seen.insert(*genre))
            .collect()
    }

    #[must_use]
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g == genre)
    }

    /// Replace every field a sync owns. Nothing is merged with the old values.
    pub fn apply_sync(&mut self, sync: ProfileSync) {
        let ProfileSync {
            top_artists,
            top_tracks,
            genres,
            metrics,
        } = sync;

        self.top_artists = top_artists;
        self.top_tracks = top_tracks;
        self.genres = genres;
        self.favorite_decades = metrics.favorite_decades;
        self.energy_score = Some(f64::from(metrics.energy_score));
        self.danceability_score = Some(f64::from(metrics.danceability_score));
        self.diversity_score = Some(f64::from(metrics.diversity_score));
        self.obscurity_score = Some(f64::from(metrics.obscurity_score));
        self.listening_history = Some(metrics.listening_patterns);
    }
}

/// Scores and summaries derived by the analyzer, all scores 0-100
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub energy_score: u8,
    pub danceability_score: u8,
    pub diversity_score: u8,
    pub obscurity_score: u8,
    /// At most three, heaviest first
    pub favorite_decades: Vec<String>,
    pub listening_patterns: ListeningPatterns,
}

/// Result of one sync: the refreshed lists plus the derived metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSync {
    pub top_artists: Vec<ArtistRef>,
    pub top_tracks: Vec<TrackRef>,
    pub genres: Vec<String>,
    pub metrics: Metrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refs_accept_bare_ids_and_objects() {
        let json = r#"{
            "user_id": "u1",
            "top_artists": ["a1", {"id": "a2", "name": "Boards of Canada", "genres": ["idm"], "popularity": 61}],
            "top_tracks": [{"id": "t1", "name": "Roygbiv", "artist": "Boards of Canada"}, "t2"]
        }"#;

        let profile: MusicProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.top_artists[0], ArtistRef::Id("a1".to_string()));
        assert_eq!(profile.top_artists[1].id(), "a2");
        assert_eq!(profile.top_artists[1].similarity_key(), "Boards of Canada");
        assert_eq!(profile.top_artists[1].genres(), ["idm".to_string()]);
        assert_eq!(profile.top_tracks[0].similarity_key(), "Roygbiv");
        assert_eq!(profile.top_tracks[1].similarity_key(), "t2");
        assert!(profile.energy_score.is_none());
        assert!(profile.listening_history.is_none());
    }

    #[test]
    fn test_ranked_counts_keep_order_through_json() {
        let counts = RankedCounts::new(vec![
            ("shoegaze".to_string(), 7),
            ("ambient".to_string(), 7),
            ("dream pop".to_string(), 2),
        ]);

        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"shoegaze":7,"ambient":7,"dream pop":2}"#);

        let back: RankedCounts = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), ["shoegaze", "ambient", "dream pop"]);
        assert_eq!(back.get("ambient"), Some(7));
        assert_eq!(back.get("jazz"), None);
    }

    #[test]
    fn test_hour_vector_zero_fills_and_ignores_bad_slots() {
        let json = r#"{"by_hour": {"0": 2, "13": 5, "23": 1}}"#;
        let patterns: ListeningPatterns = serde_json::from_str(json).unwrap();

        let slots = patterns.hour_vector();
        assert_eq!(slots[0], 2.0);
        assert_eq!(slots[13], 5.0);
        assert_eq!(slots[23], 1.0);
        assert_eq!(slots.iter().sum::<f64>(), 8.0);

        let mut odd = ListeningPatterns::default();
        odd.by_hour.insert(30, 9);
        assert_eq!(odd.hour_vector().iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn test_unique_genres_keeps_first_occurrence() {
        let profile = MusicProfile {
            genres: vec!["rock".into(), "pop".into(), "rock".into(), "jazz".into()],
            ..MusicProfile::new("u1")
        };
        assert_eq!(profile.unique_genres(), ["rock", "pop", "jazz"]);
        assert!(profile.has_genre("jazz"));
        assert!(!profile.has_genre("blues"));
    }

    #[test]
    fn test_apply_sync_replaces_wholesale() {
        let mut profile = MusicProfile {
            genres: vec!["old genre".into()],
            top_artists: vec![ArtistRef::Id("old".into())],
            favorite_decades: vec!["60s".into(), "70s".into()],
            energy_score: Some(12.0),
            ..MusicProfile::new("u1")
        };

        profile.apply_sync(ProfileSync {
            top_artists: vec![ArtistRef::Id("new".into())],
            top_tracks: vec![],
            genres: vec!["techno".into()],
            metrics: Metrics {
                energy_score: 80,
                danceability_score: 70,
                diversity_score: 40,
                obscurity_score: 55,
                favorite_decades: vec!["10s".into()],
                listening_patterns: ListeningPatterns::default(),
            },
        });

        assert_eq!(profile.user_id, "u1");
        assert_eq!(profile.genres, ["techno"]);
        assert_eq!(profile.top_artists, [ArtistRef::Id("new".into())]);
        assert!(profile.top_tracks.is_empty());
        assert_eq!(profile.favorite_decades, ["10s"]);
        assert_eq!(profile.energy_score, Some(80.0));
        assert_eq!(profile.obscurity_score, Some(55.0));
        assert!(profile.listening_history.is_some());
    }
}
