//! Error taxonomy shared across the retrieval core.

use std::fmt;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, RagError>;

/// Failures surfaced by ingestion, indexing, persistence, and retrieval.
#[derive(Debug)]
pub enum RagError {
    /// Missing source file/directory, no files matching the requested
    /// extensions, or an empty chunk output after splitting.
    InvalidInput(String),
    /// The embedding provider call failed outright (transport or HTTP).
    /// Never retried; fatal for the current batch.
    EmbeddingProvider(String),
    /// The provider answered, but no known wire shape matched the payload.
    MalformedEmbeddingResponse(String),
    /// A vector's width disagrees with the index's fixed dimension.
    DimensionMismatch {
        /// Dimension the index was created with.
        expected: usize,
        /// Width of the offending vector.
        actual: usize,
    },
    /// Paired index/chunk artifacts for a collection disagree on load, or an
    /// artifact carries an unsupported schema version.
    StorageInconsistency {
        /// Collection whose artifacts disagree.
        collection: &'static str,
        /// Human-readable description of the disagreement.
        reason: String,
    },
    /// Persisted artifacts were built with a different embedding model.
    ModelMismatch {
        /// Model configured for this session.
        expected: String,
        /// Model recorded in the artifact.
        found: String,
    },
    /// Underlying filesystem failure.
    Io(std::io::Error),
    /// Artifact (de)serialization failure.
    Json(serde_json::Error),
}

impl fmt::Display for RagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::EmbeddingProvider(msg) => write!(f, "embedding provider error: {msg}"),
            Self::MalformedEmbeddingResponse(msg) => {
                write!(f, "unrecognized embedding response shape: {msg}")
            }
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "vector dimension {actual} does not match index dimension {expected}")
            }
            Self::StorageInconsistency { collection, reason } => {
                write!(f, "collection '{collection}' artifacts are inconsistent: {reason}")
            }
            Self::ModelMismatch { expected, found } => write!(
                f,
                "artifacts were embedded with '{found}' but this session uses '{expected}'"
            ),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "serialization error: {err}"),
        }
    }
}

impl std::error::Error for RagError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
