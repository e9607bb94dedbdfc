//! Music taste compatibility engine.
//!
//! Scores how well two listeners' tastes match, explains the score per
//! dimension, ranks candidate listeners for a user, and derives the taste
//! metrics those scores are built on from raw streaming-service data.
//!
//! Core modules:
//! - [`compatibility`] - Weighted multi-signal compatibility score
//! - [`recommend`] - Top-N compatible listeners for a user
//! - [`analyzer`] - Taste metrics from raw provider data
//! - [`similarity`] - TF-IDF text similarity and numeric primitives
//!
//! ### Supporting Modules
//!
//! - [`profile`] - Stored profile data model
//! - [`provider`] - Streaming-service boundary and offline dump provider
//! - [`store`] - Profile storage interface and in-memory store
//! - [`config`] - Configuration file handling
//! - [`error`] - Error types
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use tunematch::compatibility::calculate_overall_similarity;
//! use tunematch::profile::MusicProfile;
//! use tunematch::recommend::{get_user_recommendations, RecommendationQuery};
//!
//! let mut alice = MusicProfile::new("alice");
//! alice.genres = vec!["shoegaze".into(), "dream pop".into()];
//! alice.energy_score = Some(40.0);
//!
//! let mut bob = MusicProfile::new("bob");
//! bob.genres = vec!["dream pop".into(), "indie".into()];
//! bob.energy_score = Some(55.0);
//!
//! let result = calculate_overall_similarity(&alice, &bob)?;
//! assert!(result.overall_similarity > 0.0 && result.overall_similarity < 1.0);
//! assert_eq!(result.shared_music.genres, ["dream pop"]);
//!
//! let ranked = get_user_recommendations(&alice, &[bob], &RecommendationQuery::default())?;
//! assert_eq!(ranked[0].user_id, "bob");
//! # Ok::<(), tunematch::error::EngineError>(())
//! ```
//!
//! ## Logging
//!
//! The library logs through the `log` facade. Component breakdowns are
//! logged at `debug`, e.g. `RUST_LOG=tunematch::compatibility=debug`.

pub mod analyzer;
pub mod cli;
pub mod compatibility;
pub mod completion;
pub mod config;
pub mod error;
pub mod profile;
pub mod provider;
pub mod recommend;
pub mod similarity;
pub mod store;
