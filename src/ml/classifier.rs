use crate::ml::error::{MlError, MlResult};
use crate::ml::ARTIFACT_FORMAT_VERSION;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Trait for classifiers
pub trait Classifier: Send + Sync {
    /// Class labels in column order of `predict_proba`
    fn classes(&self) -> &[String];

    /// Expected input width
    fn n_features(&self) -> usize;

    /// Predict class labels
    fn predict(&self, features: &Array2<f64>) -> MlResult<Vec<String>>;

    /// Predict class probabilities, one row per sample
    fn predict_proba(&self, features: &Array2<f64>) -> MlResult<Array2<f64>>;
}

/// Linear model over TF-IDF features (logistic regression / linear SVM style).
///
/// With two classes and a single coefficient row the model is binary and
/// probabilities come from the logistic function; otherwise softmax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    /// Artifact format version
    #[serde(default = "default_format_version")]
    pub format_version: u32,

    /// Class labels
    classes: Vec<String>,

    /// Coefficients `[n_rows, n_features]`
    coef: Array2<f64>,

    /// Intercept per coefficient row
    intercept: Array1<f64>,
}

impl LinearClassifier {
    pub fn new(classes: Vec<String>, coef: Array2<f64>, intercept: Array1<f64>) -> MlResult<Self> {
        let classifier = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            classes,
            coef,
            intercept,
        };
        classifier.validate()?;
        Ok(classifier)
    }

    fn is_binary(&self) -> bool {
        self.classes.len() == 2 && self.coef.nrows() == 1
    }

    /// Check shapes and values
    pub fn validate(&self) -> MlResult<()> {
        if self.classes.len() < 2 {
            return Err(MlError::InvalidArtifact(format!(
                "need at least 2 classes, got {}",
                self.classes.len()
            )));
        }

        let expected_rows = if self.is_binary() { 1 } else { self.classes.len() };
        if self.coef.nrows() != expected_rows {
            return Err(MlError::InvalidArtifact(format!(
                "{} classes but {} coefficient rows",
                self.classes.len(),
                self.coef.nrows()
            )));
        }

        if self.intercept.len() != self.coef.nrows() {
            return Err(MlError::InvalidArtifact(format!(
                "{} coefficient rows but {} intercepts",
                self.coef.nrows(),
                self.intercept.len()
            )));
        }

        if self.coef.iter().chain(self.intercept.iter()).any(|v| !v.is_finite()) {
            return Err(MlError::InvalidArtifact(
                "non-finite model parameter".to_string(),
            ));
        }

        Ok(())
    }

    /// Raw decision scores `[n_samples, n_rows]`
    pub fn decision_function(&self, features: &Array2<f64>) -> MlResult<Array2<f64>> {
        if features.ncols() != self.n_features() {
            return Err(MlError::DimensionMismatch {
                expected: self.n_features(),
                actual: features.ncols(),
            });
        }

        Ok(features.dot(&self.coef.t()) + &self.intercept)
    }
}

impl Classifier for LinearClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.coef.ncols()
    }

    fn predict(&self, features: &Array2<f64>) -> MlResult<Vec<String>> {
        let proba = self.predict_proba(features)?;

        proba
            .axis_iter(Axis(0))
            .map(|row| {
                argmax(row.iter().copied())
                    .map(|idx| self.classes[idx].clone())
                    .ok_or_else(|| MlError::Inference("empty probability row".to_string()))
            })
            .collect()
    }

    fn predict_proba(&self, features: &Array2<f64>) -> MlResult<Array2<f64>> {
        let scores = self.decision_function(features)?;

        if self.is_binary() {
            let mut proba = Array2::zeros((scores.nrows(), 2));
            for (i, &score) in scores.column(0).iter().enumerate() {
                let positive = 1.0 / (1.0 + (-score).exp());
                proba[[i, 0]] = 1.0 - positive;
                proba[[i, 1]] = positive;
            }
            return Ok(proba);
        }

        let mut proba = scores;
        for mut row in proba.axis_iter_mut(Axis(0)) {
            // Shift by the row max so exp() cannot overflow
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            row.mapv_inplace(|s| (s - max).exp());
            let total = row.sum();
            row.mapv_inplace(|p| p / total);
        }

        Ok(proba)
    }
}

/// Index of the largest value; the first one wins ties
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

fn default_format_version() -> u32 {
    ARTIFACT_FORMAT_VERSION
}
