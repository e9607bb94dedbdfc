//! # Profile Store
//!
//! Where profiles come from and where syncs go. The engine only needs the
//! [`ProfileStore`] trait; a real deployment backs it with its database.
//! [`InMemoryProfileStore`] backs the CLI and the tests.
//!
//! Candidate selection uses a typed [`ProfileQuery`], a list of
//! [`ProfileFilter`] predicates that must all hold:
//!
//! ```
//! use tunematch::store::ProfileQuery;
//!
//! let query = ProfileQuery::new()
//!     .exclude_user("alice")
//!     .has_any_genre(["shoegaze", "dream pop"]);
//! assert_eq!(query.filters().len(), 2);
//! ```

use crate::error::{EngineError, Result};
use crate::profile::{MusicProfile, ProfileSync};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One predicate over a stored profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileFilter {
    /// User id is one of these
    UserIdIn(Vec<String>),
    /// Any user except this one
    ExcludeUser(String),
    /// Profile lists this genre
    HasGenre(String),
    /// Profile lists at least one of these genres
    HasAnyGenre(Vec<String>),
}

impl ProfileFilter {
    #[must_use]
    pub fn matches(&self, profile: &MusicProfile) -> bool {
        match self {
            Self::UserIdIn(ids) => ids.iter().any(|id| *id == profile.user_id),
            Self::ExcludeUser(id) => *id != profile.user_id,
            Self::HasGenre(genre) => profile.has_genre(genre),
            Self::HasAnyGenre(genres) => genres.iter().any(|genre| profile.has_genre(genre)),
        }
    }
}

/// Conjunction of [`ProfileFilter`]s. An empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileQuery {
    filters: Vec<ProfileFilter>,
}

impl ProfileQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: ProfileFilter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn user_id_in<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter(ProfileFilter::UserIdIn(ids.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn exclude_user(self, user_id: impl Into<String>) -> Self {
        self.filter(ProfileFilter::ExcludeUser(user_id.into()))
    }

    #[must_use]
    pub fn has_genre(self, genre: impl Into<String>) -> Self {
        self.filter(ProfileFilter::HasGenre(genre.into()))
    }

    #[must_use]
    pub fn has_any_genre<I, S>(self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter(ProfileFilter::HasAnyGenre(
            genres.into_iter().map(Into::into).collect(),
        ))
    }

    #[must_use]
    pub fn filters(&self) -> &[ProfileFilter] {
        &self.filters
    }

    #[must_use]
    pub fn matches(&self, profile: &MusicProfile) -> bool {
        self.filters.iter().all(|filter| filter.matches(profile))
    }
}

/// Source of stored profiles and sink for sync results.
///
/// Reads hand back owned snapshots, so a calculation never holds on to
/// live storage.
pub trait ProfileStore {
    /// Profile of one user, `None` if the user has never been synced.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn get(&self, user_id: &str) -> Result<Option<MusicProfile>>;

    /// Every profile matching the query, in a stable order.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn find(&self, query: &ProfileQuery) -> Result<Vec<MusicProfile>>;

    /// Write a sync result, creating the profile if the user has none yet.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn save_sync(&mut self, user_id: &str, sync: ProfileSync) -> Result<()>;

    /// Like [`get`](Self::get) but a missing profile is an error.
    ///
    /// # Errors
    ///
    /// [`EngineError::ProfileNotFound`] if there is no profile for `user_id`.
    fn require(&self, user_id: &str) -> Result<MusicProfile> {
        self.get(user_id)?
            .ok_or_else(|| EngineError::ProfileNotFound(user_id.to_string()))
    }
}

/// [`ProfileStore`] held in memory, ordered by user id
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: BTreeMap<String, MusicProfile>,
}

impl InMemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from profiles. A repeated user id keeps the last profile.
    #[must_use]
    pub fn from_profiles(profiles: impl IntoIterator<Item = MusicProfile>) -> Self {
        let mut store = Self::new();
        for profile in profiles {
            store.insert(profile);
        }
        store
    }

    /// Parse a JSON array of profiles.
    ///
    /// # Errors
    ///
    /// Fails if the text is not an array of profiles.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let profiles: Vec<MusicProfile> = serde_json::from_str(json)?;
        Ok(Self::from_profiles(profiles))
    }

    /// Load a JSON array of profiles from disk.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not parse.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profiles file {}", path.display()))?;
        let store = Self::from_json(&json)
            .with_context(|| format!("Invalid profiles file {}", path.display()))?;

        debug!("Loaded {} profiles from {}", store.len(), path.display());
        Ok(store)
    }

    /// Insert or replace a profile, returning the one it replaced.
    pub fn insert(&mut self, profile: MusicProfile) -> Option<MusicProfile> {
        let replaced = self.profiles.insert(profile.user_id.clone(), profile);
        if let Some(old) = &replaced {
            warn!("Replacing stored profile for user {}", old.user_id);
        }
        replaced
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get(&self, user_id: &str) -> Result<Option<MusicProfile>> {
        Ok(self.profiles.get(user_id).cloned())
    }

    fn find(&self, query: &ProfileQuery) -> Result<Vec<MusicProfile>> {
        Ok(self
            .profiles
            .values()
            .filter(|profile| query.matches(profile))
            .cloned()
            .collect())
    }

    fn save_sync(&mut self, user_id: &str, sync: ProfileSync) -> Result<()> {
        self.profiles
            .entry(user_id.to_string())
            .or_insert_with(|| MusicProfile::new(user_id))
            .apply_sync(sync);
        debug!("Saved sync for user {user_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Metrics;

    fn profile(user_id: &str, genres: &[&str]) -> MusicProfile {
        MusicProfile {
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..MusicProfile::new(user_id)
        }
    }

    fn store() -> InMemoryProfileStore {
        InMemoryProfileStore::from_profiles([
            profile("carol", &["jazz", "soul"]),
            profile("alice", &["shoegaze", "dream pop"]),
            profile("bob", &["techno"]),
        ])
    }

    fn ids(profiles: &[MusicProfile]) -> Vec<&str> {
        profiles.iter().map(|p| p.user_id.as_str()).collect()
    }

    #[test]
    fn test_empty_query_returns_all_in_id_order() {
        let found = store().find(&ProfileQuery::new()).unwrap();
        assert_eq!(ids(&found), ["alice", "bob", "carol"]);
    }

    #[test]
    fn test_filters_combine_with_and() {
        let store = store();

        let query = ProfileQuery::new().exclude_user("alice");
        assert_eq!(ids(&store.find(&query).unwrap()), ["bob", "carol"]);

        let query = ProfileQuery::new()
            .exclude_user("bob")
            .has_any_genre(["techno", "soul"]);
        assert_eq!(ids(&store.find(&query).unwrap()), ["carol"]);

        let query = ProfileQuery::new().has_genre("dream pop");
        assert_eq!(ids(&store.find(&query).unwrap()), ["alice"]);

        let query = ProfileQuery::new().user_id_in(["bob", "carol", "nobody"]);
        assert_eq!(ids(&store.find(&query).unwrap()), ["bob", "carol"]);

        let query = ProfileQuery::new().has_genre("jazz").has_genre("techno");
        assert!(store.find(&query).unwrap().is_empty());
    }

    #[test]
    fn test_get_and_require() {
        let store = store();

        assert_eq!(store.get("bob").unwrap().unwrap().genres, ["techno"]);
        assert!(store.get("dave").unwrap().is_none());
        assert!(matches!(
            store.require("dave"),
            Err(EngineError::ProfileNotFound(id)) if id == "dave"
        ));
    }

    #[test]
    fn test_save_sync_overwrites_and_creates() {
        let mut store = store();
        let sync = ProfileSync {
            genres: vec!["ambient".to_string()],
            metrics: Metrics {
                energy_score: 20,
                ..Metrics::default()
            },
            ..ProfileSync::default()
        };

        store.save_sync("alice", sync.clone()).unwrap();
        let alice = store.require("alice").unwrap();
        assert_eq!(alice.genres, ["ambient"]);
        assert_eq!(alice.energy_score, Some(20.0));

        store.save_sync("dave", sync).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.require("dave").unwrap().user_id, "dave");
    }

    #[test]
    fn test_from_json_array() {
        let store = InMemoryProfileStore::from_json(
            r#"[{"user_id": "u1", "genres": ["rock"]}, {"user_id": "u2", "energy_score": 71}]"#,
        )
        .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.require("u2").unwrap().energy_score, Some(71.0));
        assert!(InMemoryProfileStore::from_json(r#"{"user_id": "u1"}"#).is_err());
    }

    #[test]
    fn test_duplicate_ids_keep_last() {
        let store = InMemoryProfileStore::from_profiles([
            profile("u1", &["rock"]),
            profile("u1", &["jazz"]),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.require("u1").unwrap().genres, ["jazz"]);
    }
}
