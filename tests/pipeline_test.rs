//! Integration tests for the prediction pipeline
//!
//! Mock components stand in for the trained artifacts so every outcome of
//! `PredictionPipeline::analyze` can be forced.

use ndarray::{array, Array2};
use review_sentiment::ml::{
    Classifier, LinearClassifier, LoadedModel, MlError, MlResult, ModelState, PredictionLabel,
    PredictionPipeline, TextVectorizer, TfidfVectorizer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct MockVectorizer {
    fail: bool,
    calls: AtomicUsize,
    /// Every document handed to `transform`, verbatim
    seen: Mutex<Vec<String>>,
}

impl TextVectorizer for MockVectorizer {
    fn transform(&self, documents: &[&str]) -> MlResult<Array2<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .extend(documents.iter().map(|d| d.to_string()));
        if self.fail {
            return Err(MlError::Inference("tokenizer exploded".to_string()));
        }
        Ok(Array2::zeros((documents.len(), 2)))
    }

    fn n_features(&self) -> usize {
        2
    }
}

struct MockClassifier {
    classes: Vec<String>,
    label: String,
    proba: Vec<f64>,
    panic: bool,
}

impl MockClassifier {
    fn answering(label: &str, proba: Vec<f64>) -> Self {
        Self {
            classes: vec!["negative".into(), "positive".into()],
            label: label.to_string(),
            proba,
            panic: false,
        }
    }
}

impl Classifier for MockClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        2
    }

    fn predict(&self, features: &Array2<f64>) -> MlResult<Vec<String>> {
        if self.panic {
            panic!("classifier blew up");
        }
        Ok(vec![self.label.clone(); features.nrows()])
    }

    fn predict_proba(&self, features: &Array2<f64>) -> MlResult<Array2<f64>> {
        let mut out = Array2::zeros((features.nrows(), self.proba.len()));
        for mut row in out.rows_mut() {
            for (cell, p) in row.iter_mut().zip(&self.proba) {
                *cell = *p;
            }
        }
        Ok(out)
    }
}

fn pipeline_with(
    vectorizer: Arc<MockVectorizer>,
    classifier: MockClassifier,
    delay: Duration,
) -> PredictionPipeline {
    let model = LoadedModel::new(vectorizer, Arc::new(classifier)).unwrap();
    PredictionPipeline::new(ModelState::Ready(model), delay)
}

fn positive_pipeline() -> PredictionPipeline {
    pipeline_with(
        Arc::new(MockVectorizer::default()),
        MockClassifier::answering("positive", vec![0.13, 0.87]),
        Duration::ZERO,
    )
}

#[tokio::test]
async fn test_positive_review() {
    let result = positive_pipeline().analyze("Great product, works perfectly").await;

    assert_eq!(result.label(), PredictionLabel::Positive);
    assert_eq!(result.sentiment(), "Positive");
    assert_eq!(result.color(), Some("#22c55e"));
    let confidence = result.confidence().unwrap();
    assert!((confidence - 87.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_and_whitespace_input_skip_the_model() {
    let vectorizer = Arc::new(MockVectorizer::default());
    let pipeline = pipeline_with(
        vectorizer.clone(),
        MockClassifier::answering("positive", vec![0.1, 0.9]),
        Duration::from_secs(5),
    );

    for input in ["", "   ", "\n\t "] {
        let start = Instant::now();
        let result = pipeline.analyze(input).await;
        assert_eq!(result.label(), PredictionLabel::EmptyInput);
        assert_eq!(result.sentiment(), "Please enter some text");
        assert!(result.confidence().is_none());
        // no pacing delay for rejected input
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    assert_eq!(vectorizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_surrounding_whitespace_reaches_the_vectorizer() {
    let vectorizer = Arc::new(MockVectorizer::default());
    let pipeline = pipeline_with(
        vectorizer.clone(),
        MockClassifier::answering("negative", vec![0.5, 0.5]),
        Duration::ZERO,
    );

    let result = pipeline.analyze("  great  ").await;

    // trimming only decides whether the input is empty
    assert_eq!(*vectorizer.seen.lock().unwrap(), vec!["  great  ".to_string()]);
    assert_eq!(result.label(), PredictionLabel::Negative);
    assert_eq!(result.confidence(), Some(50.0));
}

#[tokio::test]
async fn test_degraded_mode() {
    let pipeline = PredictionPipeline::new(
        ModelState::Degraded {
            reason: "missing artifacts".to_string(),
        },
        Duration::from_millis(10),
    );

    let result = pipeline.analyze("fine").await;
    assert_eq!(result.label(), PredictionLabel::ModelUnavailable);
    assert_eq!(result.sentiment(), "Model Error: AI engine is not ready.");
    assert!(result.confidence().is_none());

    // empty input is still reported as such
    let result = pipeline.analyze("  ").await;
    assert_eq!(result.label(), PredictionLabel::EmptyInput);
}

#[tokio::test]
async fn test_vectorizer_failure_is_analysis_failed() {
    let pipeline = pipeline_with(
        Arc::new(MockVectorizer {
            fail: true,
            ..Default::default()
        }),
        MockClassifier::answering("positive", vec![0.1, 0.9]),
        Duration::ZERO,
    );

    let result = pipeline.analyze("anything").await;
    assert_eq!(result.label(), PredictionLabel::AnalysisFailed);
    assert_eq!(result.sentiment(), "Analysis failed. Please try again.");
    assert!(result.confidence().is_none());
}

#[tokio::test]
async fn test_classifier_panic_is_analysis_failed() {
    let mut classifier = MockClassifier::answering("positive", vec![0.1, 0.9]);
    classifier.panic = true;
    let pipeline = pipeline_with(Arc::new(MockVectorizer::default()), classifier, Duration::ZERO);

    let result = pipeline.analyze("anything").await;
    assert_eq!(result.label(), PredictionLabel::AnalysisFailed);

    // the pipeline survives and keeps serving
    let result = pipeline.analyze("again").await;
    assert_eq!(result.label(), PredictionLabel::AnalysisFailed);
}

#[tokio::test]
async fn test_invalid_probabilities_are_analysis_failed() {
    let pipeline = pipeline_with(
        Arc::new(MockVectorizer::default()),
        MockClassifier::answering("positive", vec![f64::NAN, 0.5]),
        Duration::ZERO,
    );

    assert_eq!(
        pipeline.analyze("text").await.label(),
        PredictionLabel::AnalysisFailed
    );
}

#[tokio::test]
async fn test_unknown_label_falls_back() {
    let pipeline = pipeline_with(
        Arc::new(MockVectorizer::default()),
        MockClassifier::answering("mixed", vec![0.4, 0.6]),
        Duration::ZERO,
    );

    let result = pipeline.analyze("it was fine I guess").await;
    assert_eq!(result.label(), PredictionLabel::Unknown);
    assert_eq!(result.sentiment(), "Unknown");
    assert_eq!(result.color(), Some("gray"));
    assert!((result.confidence().unwrap() - 60.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_repeated_requests_are_identical() {
    let pipeline = positive_pipeline();
    let first = pipeline.analyze("Great product").await;
    let second = pipeline.analyze("Great product").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_pacing_delay_does_not_serialize_requests() {
    let delay = Duration::from_millis(300);
    let pipeline = pipeline_with(
        Arc::new(MockVectorizer::default()),
        MockClassifier::answering("positive", vec![0.2, 0.8]),
        delay,
    );

    let start = Instant::now();
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.analyze(&format!("review {}", i)).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().label(), PredictionLabel::Positive);
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= delay);
    assert!(elapsed < delay * 4, "requests ran one after another: {:?}", elapsed);
}

#[tokio::test]
async fn test_trained_linear_model_end_to_end() {
    let vocabulary: HashMap<String, usize> = [("great", 0), ("terrible", 1)]
        .into_iter()
        .map(|(t, i)| (t.to_string(), i))
        .collect();
    let vectorizer = TfidfVectorizer::new(vocabulary, vec![1.0, 1.0]).unwrap();
    let classifier = LinearClassifier::new(
        vec!["negative".into(), "neutral".into(), "positive".into()],
        array![[-2.0, 2.0], [0.0, 0.0], [2.0, -2.0]],
        array![0.0, 0.0, 0.0],
    )
    .unwrap();
    let model = LoadedModel::new(Arc::new(vectorizer), Arc::new(classifier)).unwrap();
    let pipeline = PredictionPipeline::new(model.into(), Duration::ZERO);

    let result = pipeline.analyze("Great product!").await;
    assert_eq!(result.label(), PredictionLabel::Positive);
    // softmax of [-2, 0, 2]
    let expected = 2f64.exp() / ((-2f64).exp() + 1.0 + 2f64.exp()) * 100.0;
    assert!((result.confidence().unwrap() - expected).abs() < 1e-6);

    let result = pipeline.analyze("Terrible. Just terrible.").await;
    assert_eq!(result.label(), PredictionLabel::Negative);
    assert_eq!(result.color(), Some("#ef4444"));

    // no known terms: all scores zero, first class wins the tie
    let result = pipeline.analyze("meh").await;
    assert!((result.confidence().unwrap() - 100.0 / 3.0).abs() < 1e-6);
}
