//! # Music Provider Boundary
//!
//! The analyzer reads raw listening data through the [`MusicProvider`] trait.
//! Real implementations talk to the streaming service over HTTP and own
//! authentication, timeouts and rate limiting; the engine only sees the
//! payload shapes below and [`ProviderError`] on failure.
//!
//! [`JsonDumpProvider`] serves a captured payload file, which is how the CLI
//! and the tests run a sync without network access.

use crate::error::ProviderError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Album block nested in a provider track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAlbum {
    pub name: Option<String>,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    pub release_date: Option<String>,
}

/// Artist summary nested in a provider track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArtistSummary {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Provider track object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTrack {
    pub id: String,
    pub name: String,
    /// 0-100
    pub popularity: Option<u32>,
    pub album: Option<RawAlbum>,
    pub artists: Vec<RawArtistSummary>,
}

impl RawTrack {
    /// First credited artist, which is the one used for genre lookups.
    #[must_use]
    pub fn primary_artist(&self) -> Option<&RawArtistSummary> {
        self.artists.first()
    }
}

/// Provider artist object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArtist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    /// 0-100
    pub popularity: Option<u32>,
}

/// One recently-played event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayHistoryItem {
    /// ISO-8601 timestamp
    pub played_at: Option<String>,
    pub track: Option<RawTrack>,
}

/// Audio analysis for one track. `tempo` is in BPM, the rest in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFeatures {
    pub id: Option<String>,
    pub energy: Option<f64>,
    pub danceability: Option<f64>,
    pub tempo: Option<f64>,
    pub valence: Option<f64>,
}

/// Source of raw listening data for one user.
///
/// Every call may fail with a [`ProviderError`]; the analyzer propagates it
/// unchanged.
pub trait MusicProvider {
    /// Long-term top tracks, highest rank first
    fn top_tracks(&self, limit: usize) -> Result<Vec<RawTrack>, ProviderError>;

    /// Long-term top artists, highest rank first
    fn top_artists(&self, limit: usize) -> Result<Vec<RawArtist>, ProviderError>;

    /// Recently played events
    fn recently_played(&self, limit: usize) -> Result<Vec<PlayHistoryItem>, ProviderError>;

    /// One batch lookup; the result is aligned with `track_ids` and holds
    /// `None` for tracks without analysis.
    fn audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, ProviderError>;

    /// Full artist object, used for genre lookups
    fn artist(&self, artist_id: &str) -> Result<RawArtist, ProviderError>;
}

/// Captured provider responses for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDump {
    pub top_tracks: Vec<RawTrack>,
    pub top_artists: Vec<RawArtist>,
    pub recently_played: Vec<PlayHistoryItem>,
    pub audio_features: Vec<AudioFeatures>,
    /// Extra artist objects for genre lookups beyond the top artists
    pub artists: Vec<RawArtist>,
}

/// [`MusicProvider`] answering from a [`ProviderDump`]
#[derive(Debug, Clone, Default)]
pub struct JsonDumpProvider {
    dump: ProviderDump,
}

impl JsonDumpProvider {
    #[must_use]
    pub fn new(dump: ProviderDump) -> Self {
        Self { dump }
    }

    /// Parse a dump from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Malformed`] if the text is not a valid dump.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(json)
            .map(Self::new)
            .map_err(|e| ProviderError::Malformed {
                operation: "dump",
                message: e.to_string(),
            })
    }

    /// Load a dump file from disk.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not parse.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read provider dump {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("Invalid provider dump {}", path.display()))
    }
}

impl MusicProvider for JsonDumpProvider {
    fn top_tracks(&self, limit: usize) -> Result<Vec<RawTrack>, ProviderError> {
        Ok(self.dump.top_tracks.iter().take(limit).cloned().collect())
    }

    fn top_artists(&self, limit: usize) -> Result<Vec<RawArtist>, ProviderError> {
        Ok(self.dump.top_artists.iter().take(limit).cloned().collect())
    }

    fn recently_played(&self, limit: usize) -> Result<Vec<PlayHistoryItem>, ProviderError> {
        Ok(self.dump.recently_played.iter().take(limit).cloned().collect())
    }

    fn audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, ProviderError> {
        Ok(track_ids
            .iter()
            .map(|id| {
                self.dump
                    .audio_features
                    .iter()
                    .find(|features| features.id.as_deref() == Some(id.as_str()))
                    .cloned()
            })
            .collect())
    }

    fn artist(&self, artist_id: &str) -> Result<RawArtist, ProviderError> {
        self.dump
            .artists
            .iter()
            .chain(&self.dump.top_artists)
            .find(|artist| artist.id == artist_id)
            .cloned()
            .ok_or(ProviderError::Status {
                operation: "artist",
                status: 404,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "top_tracks": [
            {"id": "t1", "name": "Windowlicker", "popularity": 58,
             "album": {"name": "Windowlicker", "release_date": "1999-03-22"},
             "artists": [{"id": "a1", "name": "Aphex Twin"}]},
            {"id": "t2", "name": "Teardrop", "popularity": 74}
        ],
        "top_artists": [
            {"id": "a1", "name": "Aphex Twin", "genres": ["idm", "electronica"], "popularity": 66}
        ],
        "audio_features": [{"id": "t2", "energy": 0.4, "danceability": 0.6}],
        "artists": [{"id": "a9", "name": "Massive Attack", "genres": ["trip hop"]}]
    }"#;

    #[test]
    fn test_dump_serves_limited_lists() {
        let provider = JsonDumpProvider::from_json(DUMP).unwrap();

        assert_eq!(provider.top_tracks(50).unwrap().len(), 2);
        assert_eq!(provider.top_tracks(1).unwrap()[0].id, "t1");
        assert_eq!(
            provider.top_tracks(1).unwrap()[0].primary_artist().and_then(|a| a.id.as_deref()),
            Some("a1")
        );
        assert!(provider.recently_played(50).unwrap().is_empty());
    }

    #[test]
    fn test_audio_features_align_with_request() {
        let provider = JsonDumpProvider::from_json(DUMP).unwrap();
        let ids = vec!["t1".to_string(), "t2".to_string()];

        let features = provider.audio_features(&ids).unwrap();
        assert_eq!(features.len(), 2);
        assert!(features[0].is_none());
        assert_eq!(features[1].as_ref().and_then(|f| f.energy), Some(0.4));
    }

    #[test]
    fn test_artist_lookup_falls_back_to_top_artists() {
        let provider = JsonDumpProvider::from_json(DUMP).unwrap();

        assert_eq!(provider.artist("a9").unwrap().genres, ["trip hop"]);
        assert_eq!(provider.artist("a1").unwrap().name, "Aphex Twin");
        assert!(matches!(
            provider.artist("nope"),
            Err(ProviderError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn test_malformed_dump_is_reported() {
        let err = JsonDumpProvider::from_json("[1, 2").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { operation: "dump", .. }));
    }
}
