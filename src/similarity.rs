//! Similarity primitives used by the compatibility calculator.
//!
//! Every function here is pure, symmetric in its two arguments and returns a
//! value in `[0, 1]`. Missing evidence (empty lists, absent histograms) scores
//! `0.0` rather than failing.
//!
//! ## Text similarity
//!
//! Each side's items are joined into one document and the pair is vectorised
//! with TF-IDF fitted on just those two documents:
//!
//! ```text
//! tokens  = lowercase words of 2+ word characters, or whitespace-separated
//!           pieces when a side has none
//! idf(t)  = ln((1 + n) / (1 + df(t))) + 1      n = 2
//! w(t)    = count(t) * idf(t)
//! sim     = cos(w_left, w_right)
//! ```
//!
//! With a two-document corpus a shared term always has `idf = 1` and a
//! one-sided term `1 + ln(3/2)`, so one-sided terms weigh a little more in
//! the norms than shared ones.

use crate::profile::ListeningPatterns;
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;
use std::collections::BTreeMap;

lazy_static! {
    /// Runs of two or more Unicode word characters
    static ref TOKEN_PATTERN: Regex =
        Regex::new(r"\b\w\w+\b").expect("token pattern is a valid regex");
}

/// Number of documents in the corpus the IDF is fitted on
const CORPUS_SIZE: f64 = 2.0;

/// TF-IDF cosine similarity between two bags of text items.
///
/// Returns `0.0` if either side is empty or blank, `1.0` when both sides
/// tokenize to the same multiset.
///
/// # Examples
///
/// ```
/// use tunematch::similarity::calculate_text_similarity;
///
/// assert_eq!(calculate_text_similarity(&["rock", "pop"], &["jazz", "blues"]), 0.0);
/// assert_eq!(calculate_text_similarity(&["rock", "pop"], &["pop", "rock"]), 1.0);
/// ```
#[must_use]
pub fn calculate_text_similarity<A, B>(left: &[A], right: &[B]) -> f64
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let left_terms = term_counts(left.iter().map(AsRef::as_ref));
    let right_terms = term_counts(right.iter().map(AsRef::as_ref));

    if left_terms.is_empty() || right_terms.is_empty() {
        trace!("No usable tokens on one side, text similarity is 0");
        return 0.0;
    }
    if left_terms == right_terms {
        return 1.0;
    }

    let shared_idf = smoothed_idf(2.0);
    let one_sided_idf = smoothed_idf(1.0);

    // Shared terms carry idf 1 on both sides; BTreeMap order keeps the sum
    // identical whichever side is passed first.
    let dot: f64 = left_terms
        .iter()
        .filter_map(|(term, &l)| {
            right_terms
                .get(term)
                .map(|&r| (l * shared_idf) * (r * shared_idf))
        })
        .sum();

    let norm = |terms: &BTreeMap<String, f64>, other: &BTreeMap<String, f64>| {
        terms
            .iter()
            .map(|(term, &count)| {
                let idf = if other.contains_key(term) { shared_idf } else { one_sided_idf };
                (count * idf).powi(2)
            })
            .sum::<f64>()
            .sqrt()
    };

    let left_norm = norm(&left_terms, &right_terms);
    let right_norm = norm(&right_terms, &left_terms);

    (dot / (left_norm * right_norm)).clamp(0.0, 1.0)
}

/// Smoothed inverse document frequency over the two-document corpus
fn smoothed_idf(document_frequency: f64) -> f64 {
    ((1.0 + CORPUS_SIZE) / (1.0 + document_frequency)).ln() + 1.0
}

/// Lowercased token counts of the whitespace-joined items.
///
/// A document with no word of two or more characters (`"r&b"`, `"M"`, a
/// single CJK glyph) is split on whitespace instead, so it still has a
/// vocabulary.
fn term_counts<'a>(items: impl Iterator<Item = &'a str>) -> BTreeMap<String, f64> {
    let document = items.collect::<Vec<_>>().join(" ").to_lowercase();

    let mut counts = BTreeMap::new();
    for token in TOKEN_PATTERN.find_iter(&document) {
        *counts.entry(token.as_str().to_string()).or_insert(0.0) += 1.0;
    }
    if counts.is_empty() {
        for token in document.split_whitespace() {
            *counts.entry(token.to_string()).or_insert(0.0) += 1.0;
        }
    }
    counts
}

/// Closeness of two scores already normalised to `[0, 1]`.
///
/// `1 - |a - b|`, clamped so out-of-range input can never go negative.
#[must_use]
pub fn numeric_similarity(a: f64, b: f64) -> f64 {
    (1.0 - (a - b).abs()).clamp(0.0, 1.0)
}

/// Plain cosine similarity of two equal-length vectors.
///
/// Zero-magnitude input yields `0.0`.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    match norm_a * norm_b {
        denom if denom > 0.0 => (dot / denom).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Cosine similarity of two 24-slot hour-of-day histograms.
///
/// `0.0` when either side has no history or an empty histogram.
#[must_use]
pub fn listening_pattern_similarity(
    left: Option<&ListeningPatterns>,
    right: Option<&ListeningPatterns>,
) -> f64 {
    match (left, right) {
        (Some(l), Some(r)) if !l.by_hour.is_empty() && !r.by_hour.is_empty() => {
            cosine_similarity(&l.hour_vector(), &r.hour_vector())
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_disjoint_and_identical_vocabularies() {
        assert_eq!(calculate_text_similarity(&["rock", "pop"], &["jazz", "blues"]), 0.0);
        assert_eq!(calculate_text_similarity(&["rock", "pop"], &["rock", "pop"]), 1.0);
    }

    #[test]
    fn test_empty_input_scores_zero() {
        let empty: [&str; 0] = [];
        assert_eq!(calculate_text_similarity(&empty, &["rock"]), 0.0);
        assert_eq!(calculate_text_similarity(&["rock"], &empty), 0.0);
        assert_eq!(calculate_text_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn test_short_items_fall_back_to_whitespace_tokens() {
        assert_eq!(calculate_text_similarity(&["a", "b"], &["a", "b"]), 1.0);
        assert_eq!(calculate_text_similarity(&["r&b"], &["R&B"]), 1.0);
        assert_eq!(calculate_text_similarity(&["M"], &["m"]), 1.0);
        assert_eq!(calculate_text_similarity(&["猫"], &["猫"]), 1.0);
        assert_eq!(calculate_text_similarity(&["x"], &["rock"]), 0.0);
        assert_eq!(calculate_text_similarity(&["r&b"], &["soul"]), 0.0);
        assert_eq!(calculate_text_similarity(&["   "], &["   "]), 0.0);
    }

    #[test]
    fn test_case_and_order_do_not_matter() {
        assert_eq!(calculate_text_similarity(&["Indie Rock"], &["rock INDIE"]), 1.0);
    }

    #[test]
    fn test_partial_overlap_matches_reference_value() {
        // left {rock, pop}, right {rock, jazz}: shared idf 1, one-sided 1 + ln 1.5
        let one_sided = 1.0 + 1.5_f64.ln();
        let expected = 1.0 / (1.0 + one_sided * one_sided);

        let sim = calculate_text_similarity(&["rock", "pop"], &["rock", "jazz"]);
        assert!((sim - expected).abs() < EPSILON, "got {sim}, want {expected}");
        assert!(sim > 0.0 && sim < 1.0);
    }

    #[test]
    fn test_duplicates_and_unicode_are_tolerated() {
        let sim = calculate_text_similarity(&["rock", "rock", "rock"], &["rock"]);
        assert!((sim - 1.0).abs() < EPSILON);

        let sim = calculate_text_similarity(&["Sigur Rós", "ВИА Гра"], &["sigur rós"]);
        assert!(sim > 0.0 && sim <= 1.0);
        assert!(sim.is_finite());

        assert_eq!(calculate_text_similarity(&["Björk"], &["björk"]), 1.0);
    }

    #[test]
    fn test_text_similarity_is_symmetric() {
        let a = ["post rock", "math rock", "emo", "midwest emo"];
        let b = ["emo", "pop punk", "rock", "rock"];
        assert_eq!(calculate_text_similarity(&a, &b), calculate_text_similarity(&b, &a));
    }

    #[test]
    fn test_numeric_similarity_is_bounded() {
        assert_eq!(numeric_similarity(0.8, 0.8), 1.0);
        assert!((numeric_similarity(0.8, 0.2) - 0.4).abs() < EPSILON);
        assert_eq!(numeric_similarity(80.0, 20.0), 0.0);
        assert_eq!(numeric_similarity(0.3, 0.9), numeric_similarity(0.9, 0.3));
    }

    #[test]
    fn test_cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < EPSILON);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
    }

    #[test]
    fn test_listening_pattern_similarity() {
        let mut morning = ListeningPatterns::default();
        morning.by_hour.insert(8, 4);
        morning.by_hour.insert(9, 2);

        let mut night = ListeningPatterns::default();
        night.by_hour.insert(23, 5);

        let mut also_morning = ListeningPatterns::default();
        also_morning.by_hour.insert(8, 2);
        also_morning.by_hour.insert(9, 1);

        assert_eq!(listening_pattern_similarity(Some(&morning), Some(&night)), 0.0);
        assert!(
            (listening_pattern_similarity(Some(&morning), Some(&also_morning)) - 1.0).abs()
                < EPSILON
        );
        assert_eq!(listening_pattern_similarity(Some(&morning), None), 0.0);
        assert_eq!(
            listening_pattern_similarity(Some(&ListeningPatterns::default()), Some(&morning)),
            0.0
        );
    }
}
