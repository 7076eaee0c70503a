use crate::ml::error::{MlError, MlResult};
use crate::ml::ARTIFACT_FORMAT_VERSION;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Turns raw text into a fixed-width numeric feature matrix.
///
/// Implementations are loaded once and shared read-only across requests.
pub trait TextVectorizer: Send + Sync {
    /// Transform a batch of documents, one row per document
    fn transform(&self, documents: &[&str]) -> MlResult<Array2<f64>>;

    /// Width of every produced row
    fn n_features(&self) -> usize;
}

/// Row normalisation applied after weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Norm {
    #[default]
    L2,
    None,
}

/// TF-IDF vectorizer restored from a trained artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Artifact format version
    #[serde(default = "default_format_version")]
    pub format_version: u32,

    /// Term -> column index
    vocabulary: HashMap<String, usize>,

    /// Inverse document frequency per column
    idf: Vec<f64>,

    /// Lowercase text before tokenizing
    #[serde(default = "default_true")]
    lowercase: bool,

    /// N-gram range (min, max), inclusive
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),

    /// Replace tf with 1 + ln(tf)
    #[serde(default)]
    sublinear_tf: bool,

    #[serde(default)]
    norm: Norm,
}

impl TfidfVectorizer {
    /// Build a vectorizer from a fitted vocabulary and its idf weights
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> MlResult<Self> {
        let vectorizer = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            vocabulary,
            idf,
            lowercase: true,
            ngram_range: default_ngram_range(),
            sublinear_tf: false,
            norm: Norm::L2,
        };
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    pub fn with_ngram_range(mut self, min: usize, max: usize) -> MlResult<Self> {
        self.ngram_range = (min, max);
        self.validate()?;
        Ok(self)
    }

    pub fn with_sublinear_tf(mut self, sublinear_tf: bool) -> Self {
        self.sublinear_tf = sublinear_tf;
        self
    }

    pub fn with_norm(mut self, norm: Norm) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    /// Check the artifact is self-consistent.
    ///
    /// Deserialised artifacts skip the constructor, so the loader calls this too.
    pub fn validate(&self) -> MlResult<()> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(MlError::InvalidArtifact(format!(
                "vocabulary has {} terms but idf has {} weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }

        if let Some((term, idx)) = self
            .vocabulary
            .iter()
            .find(|&(_, &idx)| idx >= self.idf.len())
        {
            return Err(MlError::InvalidArtifact(format!(
                "term '{}' maps to column {} outside {} features",
                term,
                idx,
                self.idf.len()
            )));
        }

        if let Some(weight) = self.idf.iter().find(|w| !w.is_finite()) {
            return Err(MlError::InvalidArtifact(format!(
                "non-finite idf weight {}",
                weight
            )));
        }

        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(MlError::InvalidArtifact(format!(
                "invalid ngram range ({}, {})",
                min_n, max_n
            )));
        }

        Ok(())
    }

    /// Terms produced for a document, in order, including unknown ones
    pub fn analyze(&self, document: &str) -> Vec<String> {
        let text = if self.lowercase {
            document.to_lowercase()
        } else {
            document.to_string()
        };

        // Word characters are alphanumerics and '_'; single characters are dropped.
        // Unlike Python's `\w`, marks with Other_Alphabetic (Devanagari vowel signs) count as word characters.
        let words: Vec<&str> = text
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| w.chars().count() >= 2)
            .collect();

        let mut terms = Vec::new();
        let (min_n, max_n) = self.ngram_range;
        for n in min_n..=max_n {
            for window in words.windows(n) {
                terms.push(window.join(" "));
            }
        }

        terms
    }

    fn weigh_row(&self, document: &str, row: &mut ndarray::ArrayViewMut1<f64>) {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for term in self.analyze(document) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }

        for (idx, count) in counts {
            let tf = if self.sublinear_tf {
                1.0 + (count as f64).ln()
            } else {
                count as f64
            };
            row[idx] = tf * self.idf[idx];
        }

        if self.norm == Norm::L2 {
            let length = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if length > 0.0 {
                row.mapv_inplace(|v| v / length);
            }
        }
    }
}

impl TextVectorizer for TfidfVectorizer {
    fn transform(&self, documents: &[&str]) -> MlResult<Array2<f64>> {
        let mut matrix = Array2::zeros((documents.len(), self.n_features()));

        for (document, mut row) in documents.iter().zip(matrix.rows_mut()) {
            self.weigh_row(document, &mut row);
        }

        Ok(matrix)
    }

    fn n_features(&self) -> usize {
        self.idf.len()
    }
}

fn default_format_version() -> u32 {
    ARTIFACT_FORMAT_VERSION
}

fn default_true() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}
