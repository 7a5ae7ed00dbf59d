//! Logging and tracing utilities

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Level used when `RUST_LOG` is unset or invalid
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log format '{0}', expected 'text' or 'json'")]
    UnknownFormat(String),

    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// `RUST_LOG` if set and valid, `default_directive` otherwise
fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Initialize tracing subscriber with default configuration
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_DIRECTIVE))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize tracing subscriber emitting JSON lines
pub fn init_tracing_json() {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_DIRECTIVE))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Install a subscriber with the given format and fallback level.
///
/// Unlike [`init_tracing`] this reports an already installed subscriber as
/// an error instead of panicking. Logs go to stderr so that stdout stays
/// free for command output.
pub fn init_tracing_with(format: LogFormat, default_directive: &str) -> Result<(), LoggingError> {
    let filter = env_filter(default_directive);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| LoggingError::Init(e.to_string()))?;
    tracing::debug!("Logging initialized with {} output", format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!("json".parse::<LogFormat>().expect("parse"), LogFormat::Json);
        assert_eq!(" Text ".parse::<LogFormat>().expect("parse"), LogFormat::Text);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(LoggingError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_log_format_serde() {
        let json = serde_json::to_string(&LogFormat::Json).expect("serialize");
        assert_eq!(json, "\"json\"");
        assert_eq!(LogFormat::default().to_string(), "text");
    }

    #[test]
    fn test_second_init_is_an_error() {
        let _ = init_tracing_with(LogFormat::Text, "warn");
        let second = init_tracing_with(LogFormat::Json, "warn");
        assert!(matches!(second, Err(LoggingError::Init(_))));
    }
}
