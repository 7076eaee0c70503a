use crate::config::ArtifactConfig;
use crate::metrics::MODEL_LOADED;
use crate::ml::classifier::{Classifier, LinearClassifier};
use crate::ml::error::{ArtifactError, MlError};
use crate::ml::vectorizer::{TextVectorizer, TfidfVectorizer};
use crate::ml::ARTIFACT_FORMAT_VERSION;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A vectorizer and classifier known to share a feature space
#[derive(Clone)]
pub struct LoadedModel {
    vectorizer: Arc<dyn TextVectorizer>,
    classifier: Arc<dyn Classifier>,
}

impl LoadedModel {
    /// Pair two components, rejecting mismatched feature widths
    pub fn new(
        vectorizer: Arc<dyn TextVectorizer>,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, ArtifactError> {
        if vectorizer.n_features() != classifier.n_features() {
            return Err(ArtifactError::Incompatible(MlError::DimensionMismatch {
                expected: classifier.n_features(),
                actual: vectorizer.n_features(),
            }));
        }

        Ok(Self::new_unchecked(vectorizer, classifier))
    }

    /// Pair two components without checking them against each other
    pub fn new_unchecked(
        vectorizer: Arc<dyn TextVectorizer>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            vectorizer,
            classifier,
        }
    }

    pub fn vectorizer(&self) -> &Arc<dyn TextVectorizer> {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("n_features", &self.classifier.n_features())
            .field("classes", &self.classifier.classes())
            .finish()
    }
}

/// Whether prediction is available for this process
#[derive(Clone, Debug)]
pub enum ModelState {
    Ready(LoadedModel),
    /// Artifacts failed to load; everything except prediction keeps working
    Degraded { reason: String },
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        match self {
            ModelState::Ready(model) => Some(model),
            ModelState::Degraded { .. } => None,
        }
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            ModelState::Ready(_) => None,
            ModelState::Degraded { reason } => Some(reason),
        }
    }
}

impl From<LoadedModel> for ModelState {
    fn from(model: LoadedModel) -> Self {
        ModelState::Ready(model)
    }
}

/// Loads the persisted vectorizer and classifier
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    vectorizer_path: PathBuf,
    classifier_path: PathBuf,
}

impl ArtifactLoader {
    pub fn new(vectorizer_path: impl Into<PathBuf>, classifier_path: impl Into<PathBuf>) -> Self {
        Self {
            vectorizer_path: vectorizer_path.into(),
            classifier_path: classifier_path.into(),
        }
    }

    pub fn from_config(config: &ArtifactConfig, app_root: &Path) -> Self {
        Self::new(
            config.vectorizer_path(app_root),
            config.classifier_path(app_root),
        )
    }

    pub fn vectorizer_path(&self) -> &Path {
        &self.vectorizer_path
    }

    pub fn classifier_path(&self) -> &Path {
        &self.classifier_path
    }

    /// Load both artifacts, failing on the first problem
    pub fn load(&self) -> Result<LoadedModel, ArtifactError> {
        // Both must exist before either is parsed
        for path in [&self.vectorizer_path, &self.classifier_path] {
            if !path.exists() {
                return Err(ArtifactError::Missing(path.clone()));
            }
        }

        let vectorizer: TfidfVectorizer = read_artifact(&self.vectorizer_path)?;
        check_version(&self.vectorizer_path, vectorizer.format_version)?;
        vectorizer.validate()?;

        let classifier: LinearClassifier = read_artifact(&self.classifier_path)?;
        check_version(&self.classifier_path, classifier.format_version)?;
        classifier.validate()?;

        LoadedModel::new(Arc::new(vectorizer), Arc::new(classifier))
    }

    /// Load both artifacts or fall back to degraded mode. Never fails.
    pub fn load_or_degrade(&self) -> ModelState {
        match self.load() {
            Ok(model) => {
                MODEL_LOADED.set(1.0);
                info!(
                    vectorizer = %self.vectorizer_path.display(),
                    classifier = %self.classifier_path.display(),
                    n_features = model.classifier().n_features(),
                    classes = ?model.classifier().classes(),
                    "✅ Sentiment model loaded"
                );
                ModelState::Ready(model)
            }
            Err(e) => {
                MODEL_LOADED.set(0.0);
                match &e {
                    ArtifactError::Missing(path) => warn!(
                        path = %path.display(),
                        "⚠️  Model files not found, prediction disabled"
                    ),
                    other => error!(error = %other, "Error loading models, prediction disabled"),
                }
                ModelState::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Persist a vectorizer/classifier pair at this loader's locations
    pub fn store(
        &self,
        vectorizer: &TfidfVectorizer,
        classifier: &LinearClassifier,
    ) -> Result<(), ArtifactError> {
        write_artifact(&self.vectorizer_path, vectorizer)?;
        write_artifact(&self.classifier_path, classifier)
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Deserialize {
        path: path.to_path_buf(),
        source,
    })
}

fn write_artifact<T: Serialize>(path: &Path, artifact: &T) -> Result<(), ArtifactError> {
    let map_io = |source: std::io::Error| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(map_io)?;
    }

    let json = serde_json::to_vec_pretty(artifact).map_err(|e| map_io(e.into()))?;
    std::fs::write(path, json).map_err(map_io)
}

fn check_version(path: &Path, found: u32) -> Result<(), ArtifactError> {
    if found != ARTIFACT_FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedVersion {
            path: path.to_path_buf(),
            found,
            supported: ARTIFACT_FORMAT_VERSION,
        });
    }
    Ok(())
}
