//! Error types for the ml module

use std::path::PathBuf;

/// Result type for inference operations
pub type MlResult<T> = std::result::Result<T, MlError>;

/// Errors raised while transforming or classifying text
#[derive(Debug, thiserror::Error)]
pub enum MlError {
    /// Input width does not match what the model was trained on
    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Artifact contents are internally inconsistent
    #[error("Inconsistent artifact: {0}")]
    InvalidArtifact(String),

    /// The model produced something unusable
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Errors raised while loading trained artifacts from disk
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Artifact file does not exist
    #[error("Artifact not found: {}", .0.display())]
    Missing(PathBuf),

    /// Artifact file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact file could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact file is not a valid artifact document
    #[error("Failed to deserialize {}: {source}", .path.display())]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Artifact was written by an incompatible format version
    #[error("Unsupported format version {found} in {} (supported: {supported})", .path.display())]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    /// Artifact failed validation or does not pair with its counterpart
    #[error("Incompatible artifacts: {0}")]
    Incompatible(#[from] MlError),
}
