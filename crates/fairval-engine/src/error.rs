//! Error types for company analysis

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::resolver::DirectoryEntry;
use crate::sources::SourceKind;

/// Errors that abort an analysis request.
///
/// Only identifier resolution and engine construction can fail a request;
/// provider failures degrade into unavailable fields instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Query was empty after trimming
    #[error("Query must not be empty")]
    InvalidQuery,

    /// No security in the directory matches the query
    #[error("No security matches '{query}'")]
    NotFound { query: String },

    /// Several equally ranked securities match the query
    #[error(
        "'{query}' matches {} securities: {}",
        .candidates.len(),
        describe_candidates(.candidates)
    )]
    AmbiguousQuery {
        query: String,
        candidates: Vec<DirectoryEntry>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Security directory could not be loaded
    #[error("Directory error: {0}")]
    Directory(String),
}

fn describe_candidates(candidates: &[DirectoryEntry]) -> String {
    candidates
        .iter()
        .map(|entry| format!("{} ({})", entry.name, entry.code))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Provider failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorKind {
    /// Connection or transport failure
    Network,
    /// Call exceeded the per-attempt timeout
    Timeout,
    /// Provider asked us to slow down
    RateLimited,
    /// Provider answered with a server error
    Upstream,
    /// Provider does not know the requested code
    UnknownCode,
    /// Provider knows the code but has nothing at or before the as-of date
    NoData,
    /// Payload could not be decoded
    Malformed,
    /// Provider refused the request
    Rejected,
}

impl SourceErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Upstream => "upstream",
            Self::UnknownCode => "unknown_code",
            Self::NoData => "no_data",
            Self::Malformed => "malformed",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a retry has a chance of succeeding.
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Upstream
        )
    }
}

impl Display for SourceErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single provider failed (after retries, when seen by the aggregator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} source unavailable ({kind}): {message}")]
pub struct SourceError {
    pub provider: SourceKind,
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(provider: SourceKind, kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(provider: SourceKind, after: std::time::Duration) -> Self {
        Self::new(
            provider,
            SourceErrorKind::Timeout,
            format!("no response within {after:?}"),
        )
    }

    pub fn unknown_code(provider: SourceKind, key: &str) -> Self {
        Self::new(
            provider,
            SourceErrorKind::UnknownCode,
            format!("'{key}' is not known to this source"),
        )
    }

    pub fn no_data(provider: SourceKind, message: impl Into<String>) -> Self {
        Self::new(provider, SourceErrorKind::NoData, message)
    }

    pub fn malformed(provider: SourceKind, message: impl Into<String>) -> Self {
        Self::new(provider, SourceErrorKind::Malformed, message)
    }

    pub const fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}
