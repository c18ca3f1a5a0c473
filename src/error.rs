//! Error types for the resolution pipeline

use thiserror::Error;

/// Result type alias for rdfdoc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rdfdoc.
///
/// `Parse` and `PathEvaluation` are recovered where they occur (the offending
/// line or derived triple is dropped). `MissingIndex` degrades Stage 3 to
/// no fan-out. Everything else aborts the enclosing stage.
#[derive(Error, Debug)]
pub enum Error {
    /// One input line could not be read as a triple
    #[error("Parse error: {0}")]
    Parse(String),

    /// One derived triple could not be synthesized
    #[error("Path evaluation error: {0}")]
    PathEvaluation(String),

    /// The satellite index artifact is absent
    #[error("Missing satellite index: {0}")]
    MissingIndex(String),

    /// The satellite index artifact (or a stage output) could not be persisted
    #[error("Artifact write error: {0}")]
    ArtifactWrite(String),

    /// Resolution rules missing or unparseable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors that only ever affect a single triple and are skipped locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Parse(_) | Error::PathEvaluation(_) | Error::MissingIndex(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::ArtifactWrite(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Configuration(err.to_string())
    }
}
