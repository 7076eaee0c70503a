use crate::metrics::{ANALYSIS_DURATION_SECONDS, ANALYSIS_REQUESTS_TOTAL};
use crate::ml::artifacts::{LoadedModel, ModelState};
use crate::ml::error::{MlError, MlResult};
use serde::Serialize;
use std::str::FromStr;
use std::time::{Duration, Instant};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, error};

/// Colour hint for results that are not a recognised sentiment
pub const FALLBACK_COLOR: &str = "gray";

/// Fixed set of sentiments the model is expected to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Parse a raw model label. Matching is exact: `"Positive"` is not a known label.
    pub fn from_model_label(label: &str) -> Option<Self> {
        Sentiment::from_str(label).ok()
    }

    /// Display label and colour
    pub fn presentation(self) -> (PredictionLabel, &'static str) {
        match self {
            Sentiment::Positive => (PredictionLabel::Positive, "#22c55e"),
            Sentiment::Negative => (PredictionLabel::Negative, "#ef4444"),
            Sentiment::Neutral => (PredictionLabel::Neutral, "#6b7280"),
        }
    }
}

/// Every label a [`PredictionResult`] can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr)]
pub enum PredictionLabel {
    Positive,
    Negative,
    Neutral,
    /// The model answered with a label outside [`Sentiment`]
    Unknown,
    #[serde(rename = "prompt_empty_input")]
    #[strum(serialize = "prompt_empty_input")]
    EmptyInput,
    #[serde(rename = "model_unavailable")]
    #[strum(serialize = "model_unavailable")]
    ModelUnavailable,
    #[serde(rename = "analysis_failed")]
    #[strum(serialize = "analysis_failed")]
    AnalysisFailed,
}

impl PredictionLabel {
    /// Stable machine-readable code
    pub fn code(self) -> &'static str {
        self.into()
    }

    /// Text shown to the user
    pub fn message(self) -> &'static str {
        match self {
            PredictionLabel::Positive => "Positive",
            PredictionLabel::Negative => "Negative",
            PredictionLabel::Neutral => "Neutral",
            PredictionLabel::Unknown => "Unknown",
            PredictionLabel::EmptyInput => "Please enter some text",
            PredictionLabel::ModelUnavailable => "Model Error: AI engine is not ready.",
            PredictionLabel::AnalysisFailed => "Analysis failed. Please try again.",
        }
    }

    /// True when the label came out of the classifier
    pub fn is_classification(self) -> bool {
        matches!(
            self,
            PredictionLabel::Positive
                | PredictionLabel::Negative
                | PredictionLabel::Neutral
                | PredictionLabel::Unknown
        )
    }
}

/// Outcome of one analysis request.
///
/// Built only through the constructors below, so `confidence` is present
/// exactly when the label is a classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    label: PredictionLabel,
    sentiment: &'static str,
    confidence: Option<f64>,
    color: Option<&'static str>,
}

impl PredictionResult {
    pub fn empty_input() -> Self {
        Self::message_only(PredictionLabel::EmptyInput, None)
    }

    pub fn model_unavailable() -> Self {
        Self::message_only(PredictionLabel::ModelUnavailable, Some(FALLBACK_COLOR))
    }

    pub fn analysis_failed() -> Self {
        Self::message_only(PredictionLabel::AnalysisFailed, Some(FALLBACK_COLOR))
    }

    /// Result for a model answer; `confidence` is a percentage and is clamped to [0, 100]
    pub fn classified(raw_label: &str, confidence: f64) -> Self {
        let (label, color) = match Sentiment::from_model_label(raw_label) {
            Some(sentiment) => sentiment.presentation(),
            None => (PredictionLabel::Unknown, FALLBACK_COLOR),
        };

        Self {
            label,
            sentiment: label.message(),
            confidence: Some(confidence.clamp(0.0, 100.0)),
            color: Some(color),
        }
    }

    fn message_only(label: PredictionLabel, color: Option<&'static str>) -> Self {
        Self {
            label,
            sentiment: label.message(),
            confidence: None,
            color,
        }
    }

    pub fn label(&self) -> PredictionLabel {
        self.label
    }

    /// User-facing text for the label
    pub fn sentiment(&self) -> &'static str {
        self.sentiment
    }

    /// Max class probability as a percentage
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn color(&self) -> Option<&'static str> {
        self.color
    }
}

/// Raw classifier answer for one document
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub label: String,
    /// Max probability, 0.0 - 1.0
    pub max_probability: f64,
}

/// Validate, vectorize, classify and map one review.
///
/// Holds the read-only model shared by every request; cloning is cheap.
#[derive(Clone, Debug)]
pub struct PredictionPipeline {
    model: ModelState,
    pacing_delay: Duration,
}

impl PredictionPipeline {
    pub fn new(model: ModelState, pacing_delay: Duration) -> Self {
        Self {
            model,
            pacing_delay,
        }
    }

    pub fn model_state(&self) -> &ModelState {
        &self.model
    }

    pub fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }

    /// Analyze one review. Always returns a displayable result.
    ///
    /// Callers must have checked the session already.
    pub async fn analyze(&self, review_text: &str) -> PredictionResult {
        let start = Instant::now();
        let result = self.run(review_text).await;

        ANALYSIS_REQUESTS_TOTAL
            .with_label_values(&[result.label().code()])
            .inc();
        ANALYSIS_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());

        debug!(
            outcome = result.label().code(),
            confidence = ?result.confidence(),
            "Review analyzed"
        );

        result
    }

    async fn run(&self, review_text: &str) -> PredictionResult {
        if review_text.trim().is_empty() {
            return PredictionResult::empty_input();
        }

        let model = match self.model.model() {
            Some(model) => model.clone(),
            None => return PredictionResult::model_unavailable(),
        };

        if !self.pacing_delay.is_zero() {
            tokio::time::sleep(self.pacing_delay).await;
        }

        let text = review_text.to_owned();
        match tokio::task::spawn_blocking(move || infer(&model, &text)).await {
            Ok(Ok(inference)) => {
                PredictionResult::classified(&inference.label, inference.max_probability * 100.0)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Prediction error");
                PredictionResult::analysis_failed()
            }
            Err(e) => {
                error!(error = %e, "Prediction task aborted");
                PredictionResult::analysis_failed()
            }
        }
    }
}

/// Run the vectorizer and classifier on a single document
pub fn infer(model: &LoadedModel, text: &str) -> MlResult<Inference> {
    let features = model.vectorizer().transform(&[text])?;
    if features.nrows() != 1 {
        return Err(MlError::Inference(format!(
            "vectorizer returned {} rows for one document",
            features.nrows()
        )));
    }

    let label = model
        .classifier()
        .predict(&features)?
        .into_iter()
        .next()
        .ok_or_else(|| MlError::Inference("classifier returned no label".to_string()))?;

    let proba = model.classifier().predict_proba(&features)?;
    let row = proba
        .rows()
        .into_iter()
        .next()
        .ok_or_else(|| MlError::Inference("classifier returned no probabilities".to_string()))?;

    if row.is_empty() {
        return Err(MlError::Inference("empty probability distribution".to_string()));
    }
    if let Some(p) = row.iter().find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0 + 1e-9) {
        return Err(MlError::Inference(format!("invalid probability {}", p)));
    }

    let max_probability = row.iter().copied().fold(0.0, f64::max).min(1.0);

    Ok(Inference {
        label,
        max_probability,
    })
}
