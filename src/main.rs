//! # tunematch
//!
//! Command-line front end for the compatibility engine. Profiles and
//! provider dumps are read from JSON files; results go to stdout.
//!
//! ## Usage
//!
//! ```bash
//! # Score two listeners
//! tunematch compare alice.json bob.json
//!
//! # Best matches for one listener among many
//! tunematch recommend alice --profiles users.json --limit 5
//!
//! # Derive metrics from captured provider responses
//! tunematch analyze dump.json --user-id alice > alice.json
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;
use tunematch::analyzer::sync_with_retry;
use tunematch::cli::{self, Args};
use tunematch::compatibility::{calculate_overall_similarity, mutual_interests, CompatibilityResult};
use tunematch::completion;
use tunematch::config::EngineConfig;
use tunematch::profile::MusicProfile;
use tunematch::provider::JsonDumpProvider;
use tunematch::recommend::{recommend_for_user, RecommendationQuery, RecommendedUser};
use tunematch::store::InMemoryProfileStore;

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path),
        None => EngineConfig::load(),
    }
}

fn load_profile(path: &Path) -> Result<MusicProfile> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile file {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid profile file {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_compatibility(first: &str, second: &str, result: &CompatibilityResult) {
    println!(
        "{first} <-> {second}: {}% ({:.4})",
        result.percent(),
        result.overall_similarity
    );
    println!();
    println!("{:<30} {:>10} {:>8} {:>12}", "component", "similarity", "weight", "contribution");
    for component in result.named_components() {
        println!(
            "{:<30} {:>10.4} {:>8.2} {:>12.4}",
            component.name,
            component.similarity,
            component.weight,
            component.contribution()
        );
    }

    let shared = &result.shared_music;
    let list = |items: &[String]| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };
    println!();
    println!("Shared artists: {}", list(&shared.artists));
    println!("Shared tracks:  {}", list(&shared.tracks));
    println!("Shared genres:  {}", list(&shared.genres));
}

fn print_recommendations(user_id: &str, ranked: &[RecommendedUser]) {
    if ranked.is_empty() {
        println!("No recommendations for {user_id}");
        return;
    }

    println!("Recommendations for {user_id}:");
    for (rank, rec) in ranked.iter().enumerate() {
        let genres = &rec.compatibility.shared_music.genres;
        println!(
            "{:>3}. {:<24} {:>3}%  {}",
            rank + 1,
            rec.user_id,
            rec.compatibility.percent(),
            genres.join(", ")
        );
    }
}

/// Parses arguments, loads configuration and runs the requested command.
///
/// Logging is controlled with `RUST_LOG`, e.g.
/// `RUST_LOG=tunematch::compatibility=debug tunematch compare a.json b.json`.
fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    debug!("Using config {config:?}");

    match args.command {
        cli::Command::Compare { first, second, json } => {
            let a = load_profile(&first)?;
            let b = load_profile(&second)?;
            let result = calculate_overall_similarity(&a, &b)?;

            if json {
                print_json(&result)?;
            } else {
                print_compatibility(&a.user_id, &b.user_id, &result);
            }
        }
        cli::Command::Recommend {
            user_id,
            profiles,
            limit,
            min_score,
            genres,
            json,
        } => {
            let store = InMemoryProfileStore::from_path(&profiles)?;
            let query = RecommendationQuery {
                limit: limit.unwrap_or(config.recommendation_limit),
                min_score,
                genres,
            };

            info!("Recommending for {user_id} with {query:?}");
            let ranked = recommend_for_user(&store, &user_id, &query)?;

            if json {
                print_json(&ranked)?;
            } else {
                print_recommendations(&user_id, &ranked);
            }
        }
        cli::Command::Analyze { dump, user_id } => {
            let provider = JsonDumpProvider::from_path(&dump)?;
            let sync = sync_with_retry(&provider, &config.sync)?;

            match user_id {
                Some(user_id) => {
                    let mut profile = MusicProfile::new(user_id);
                    profile.apply_sync(sync);
                    print_json(&profile)?;
                }
                None => print_json(&sync)?,
            }
        }
        cli::Command::Mutual { first, second } => {
            let a = load_profile(&first)?;
            let b = load_profile(&second)?;
            print_json(&mutual_interests(&a.top_artists, &b.top_artists))?;
        }
        cli::Command::Completion { shell } => {
            let mut cmd = Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(shell),
                &mut cmd,
                &mut io::stdout(),
            );
        }
    }

    Ok(())
}
