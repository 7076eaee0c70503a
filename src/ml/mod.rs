/// Sentiment prediction over pretrained artifacts
///
/// This module provides:
/// - The TF-IDF vectorizer and linear classifier artifact formats
/// - Loading both artifacts at startup, with degraded mode on failure
/// - The prediction pipeline that turns review text into a displayable result

pub mod artifacts;
pub mod classifier;
pub mod error;
pub mod pipeline;
pub mod vectorizer;

/// Version written into, and required from, every persisted artifact
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

pub use artifacts::{ArtifactLoader, LoadedModel, ModelState};
pub use classifier::{Classifier, LinearClassifier};
pub use error::{ArtifactError, MlError, MlResult};
pub use pipeline::{
    infer, Inference, PredictionLabel, PredictionPipeline, PredictionResult, Sentiment,
    FALLBACK_COLOR,
};
pub use vectorizer::{Norm, TextVectorizer, TfidfVectorizer};
