//! # Error Types
//!
//! Failures the engine can report to its caller. Thin profiles are never an
//! error: missing lists and scores fall back to neutral defaults inside the
//! analyzer and calculator. What remains are upstream fetch failures during a
//! sync, malformed numeric input, and lookups for profiles that do not exist.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure reported by a [`MusicProvider`](crate::provider::MusicProvider).
///
/// The analyzer passes these through untouched so the caller can decide
/// between retrying and surfacing a service error.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport failure before a response arrived
    #[error("network error while calling {operation}: {message}")]
    Network {
        operation: &'static str,
        message: String,
    },

    /// Provider answered with a non-2xx status
    #[error("{operation} returned HTTP {status}")]
    Status { operation: &'static str, status: u16 },

    /// Response body could not be interpreted
    #[error("malformed {operation} payload: {message}")]
    Malformed {
        operation: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Network failures, throttling and 5xx responses are worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed { .. } => false,
        }
    }
}

/// Errors surfaced by the compatibility engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Upstream provider call failed during a sync
    #[error(transparent)]
    Upstream(#[from] ProviderError),

    /// A numeric profile field held NaN or infinity
    #[error("profile field `{field}` is not a finite number ({value})")]
    NonFiniteScore { field: &'static str, value: f64 },

    /// No profile stored for the requested user
    #[error("music profile not found for user {0}")]
    ProfileNotFound(String),
}

impl EngineError {
    /// Whether the same call may succeed if repeated later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream(err) => err.is_retryable(),
            Self::NonFiniteScore { .. } | Self::ProfileNotFound(_) => false,
        }
    }
}
