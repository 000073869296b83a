//! Error types for infradiag.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the library layers.
///
/// The orchestrator never lets these escape a single render; they are folded
/// into a fatal [`Outcome`](crate::outcome::Outcome) instead.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("environment path not found: {}", .0.display())]
    EnvironmentNotFound(PathBuf),
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl InfraError {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        InfraError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, InfraError>;
