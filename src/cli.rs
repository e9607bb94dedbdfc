//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `tunematch` binary.
//!
//! ## Commands
//!
//! - `compare`: Score two profile files against each other
//! - `recommend`: Rank the profiles in a file for one user
//! - `analyze`: Derive a profile sync from a captured provider dump
//! - `mutual`: Summarise shared top artists and genres of two profiles
//! - `completion`: Print a shell completion script
//!
//! ## Examples
//!
//! ```bash
//! tunematch compare alice.json bob.json
//! tunematch recommend alice --profiles users.json --limit 5 --genre shoegaze
//! tunematch analyze dump.json --user-id alice
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "tunematch")]
#[command(about = "tunematch: music taste compatibility scores and listener recommendations")]
#[command(version)]
pub struct Args {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, env = "TUNEMATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare two music profiles
    ///
    /// Each file holds one profile as JSON. Prints the overall score, the
    /// weighted breakdown and the artists, tracks and genres both share.
    Compare {
        /// First profile file
        first: PathBuf,

        /// Second profile file
        second: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recommend compatible listeners for a user
    ///
    /// Reads a JSON array of profiles, scores every other profile against
    /// the user's, and prints the best matches.
    Recommend {
        /// User to recommend for
        user_id: String,

        /// File holding a JSON array of profiles
        #[arg(short, long)]
        profiles: PathBuf,

        /// Maximum number of results (defaults to the configured limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Drop results scoring below this overall similarity (0.0 to 1.0)
        #[arg(long)]
        min_score: Option<f64>,

        /// Only keep results sharing this genre (repeatable)
        #[arg(short, long = "genre")]
        genres: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Derive a profile sync from a captured provider dump
    ///
    /// Prints the refreshed lists and metrics as JSON. With `--user-id` the
    /// sync is applied to a fresh profile and the whole profile is printed.
    Analyze {
        /// Provider dump file
        dump: PathBuf,

        /// Print a complete profile for this user instead of the raw sync
        #[arg(long)]
        user_id: Option<String>,
    },

    /// Show top artists and genres two profiles have in common
    Mutual {
        /// First profile file
        first: PathBuf,

        /// Second profile file
        second: PathBuf,
    },

    /// Generate shell completion scripts
    ///
    /// Usage: tunematch completion bash > ~/.local/share/bash-completion/completions/tunematch
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
