//! # Recommendation Ranker
//!
//! Scores one target profile against many candidates and keeps the best.
//!
//! ## Ordering
//!
//! Candidates are scored in parallel but collected in input order, then
//! stably sorted by descending `overall_similarity`. Equal scores therefore
//! keep the order the candidates were supplied in, and the output is the
//! same on every run.
//!
//! ## Filtering
//!
//! A [`RecommendationQuery`] drops results below `min_score` and, when genres
//! are given, results that share none of them. Filters run before the list
//! is cut to `limit`. The ranker scores every candidate it is handed;
//! [`recommend_for_user`] is what leaves the user's own profile out.

use crate::compatibility::{calculate_overall_similarity, CompatibilityResult};
use crate::config::DEFAULT_RECOMMENDATION_LIMIT;
use crate::error::Result;
use crate::profile::MusicProfile;
use crate::store::{ProfileQuery, ProfileStore};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What to recommend and how many
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    /// Longest list returned
    pub limit: usize,
    /// Results scoring below this overall similarity are dropped
    pub min_score: Option<f64>,
    /// If non-empty, a result must share at least one of these genres
    pub genres: Vec<String>,
}

impl Default for RecommendationQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RECOMMENDATION_LIMIT,
            min_score: None,
            genres: Vec::new(),
        }
    }
}

impl RecommendationQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    #[must_use]
    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genres.push(genre.into());
        self
    }

    fn accepts(&self, result: &CompatibilityResult) -> bool {
        if self
            .min_score
            .is_some_and(|min| result.overall_similarity < min)
        {
            return false;
        }
        self.genres.is_empty()
            || self
                .genres
                .iter()
                .any(|genre| result.shared_music.genres.contains(genre))
    }
}

/// One entry of a ranked recommendation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedUser {
    pub user_id: String,
    /// Same as `compatibility.overall_similarity`
    pub similarity_score: f64,
    pub compatibility: CompatibilityResult,
}

/// Rank `candidates` by compatibility with `target`.
///
/// Sorted by descending similarity, ties in input order, at most
/// `query.limit` long. Candidates with missing data are scored with neutral
/// defaults, never skipped. An empty candidate list gives an empty result.
///
/// # Errors
///
/// [`EngineError::NonFiniteScore`](crate::error::EngineError::NonFiniteScore)
/// if the target or any candidate holds a non-finite metric.
///
/// # Examples
///
/// ```
/// use tunematch::profile::MusicProfile;
/// use tunematch::recommend::{get_user_recommendations, RecommendationQuery};
///
/// let me = MusicProfile::new("me");
/// let ranked = get_user_recommendations(&me, &[], &RecommendationQuery::default())?;
/// assert!(ranked.is_empty());
/// # Ok::<(), tunematch::error::EngineError>(())
/// ```
pub fn get_user_recommendations(
    target: &MusicProfile,
    candidates: &[MusicProfile],
    query: &RecommendationQuery,
) -> Result<Vec<RecommendedUser>> {
    let scored: Vec<RecommendedUser> = candidates
        .par_iter()
        .map(|candidate| {
            calculate_overall_similarity(target, candidate).map(|compatibility| RecommendedUser {
                user_id: candidate.user_id.clone(),
                similarity_score: compatibility.overall_similarity,
                compatibility,
            })
        })
        .collect::<Result<_>>()?;

    let mut ranked: Vec<RecommendedUser> = scored
        .into_iter()
        .filter(|rec| query.accepts(&rec.compatibility))
        .collect();

    // stable: equal scores keep input order
    ranked.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    ranked.truncate(query.limit);

    debug!(
        "Ranked {} of {} candidates for {}",
        ranked.len(),
        candidates.len(),
        target.user_id
    );
    Ok(ranked)
}

/// Load the target and every other profile from `store`, then rank.
///
/// All profiles are snapshotted before any scoring starts.
///
/// # Errors
///
/// [`EngineError::ProfileNotFound`](crate::error::EngineError::ProfileNotFound)
/// if `user_id` has no profile, store failures, and anything
/// [`get_user_recommendations`] reports.
pub fn recommend_for_user<S: ProfileStore + ?Sized>(
    store: &S,
    user_id: &str,
    query: &RecommendationQuery,
) -> Result<Vec<RecommendedUser>> {
    let target = store.require(user_id)?;
    let candidates = store.find(&ProfileQuery::new().exclude_user(user_id))?;

    info!(
        "Recommending for {user_id} from {} candidates",
        candidates.len()
    );
    get_user_recommendations(&target, &candidates, query)
}
