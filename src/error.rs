//! Error types for the match engine

use thiserror::Error;

/// Result type alias for facematch operations
pub type Result<T> = std::result::Result<T, MatchError>;

/// Error types that can occur while storing, indexing or matching embeddings
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Embedding store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Embedding store corrupted: {0}")]
    CorruptStore(String),

    #[error("Index is empty")]
    EmptyIndex,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No face detected")]
    NoFaceDetected,

    #[error("Label already enrolled: {label}")]
    DuplicateLabel { label: String },

    #[error("Invalid label: {reason}")]
    InvalidLabel { reason: String },

    #[error("Invalid embedding: {reason}")]
    InvalidEmbedding { reason: String },

    #[error("Persistence write failed: {0}")]
    PersistenceWriteFailed(String),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl MatchError {
    /// Whether the error was caused by the caller's input rather than by the
    /// engine or its storage. Transports map these to "bad request".
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            MatchError::DimensionMismatch { .. }
                | MatchError::NoFaceDetected
                | MatchError::DuplicateLabel { .. }
                | MatchError::InvalidLabel { .. }
                | MatchError::InvalidEmbedding { .. }
                | MatchError::ExtractionError(_)
        )
    }
}

impl From<bincode::Error> for MatchError {
    fn from(err: bincode::Error) -> Self {
        MatchError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for MatchError {
    fn from(err: serde_json::Error) -> Self {
        MatchError::SerializationError(err.to_string())
    }
}
