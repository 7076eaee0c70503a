/// Prometheus metrics for the review sentiment service.
///
/// Covers HTTP traffic, prediction outcomes, model availability and
/// identity provider calls. Metrics are always updated; they are only
/// exported once `init_metrics` has registered them.
///
/// # Example
/// ```no_run
/// use review_sentiment::metrics::ANALYSIS_REQUESTS_TOTAL;
///
/// ANALYSIS_REQUESTS_TOTAL.with_label_values(&["Positive"]).inc();
/// ```

mod middleware;

pub use middleware::track_http_metrics;

use lazy_static::lazy_static;
use prometheus::{CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "review_sentiment";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    // ============================================================================
    // Prediction Metrics
    // ============================================================================

    /// Prediction pipeline results
    ///
    /// Labels: outcome (result label code)
    pub static ref ANALYSIS_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("analysis_requests_total", "Total number of review analyses by outcome")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create ANALYSIS_REQUESTS_TOTAL metric");

    /// Time spent in the prediction pipeline, pacing delay included
    pub static ref ANALYSIS_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "analysis_duration_seconds",
            "Prediction pipeline duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.01, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0])
    ).expect("Failed to create ANALYSIS_DURATION_SECONDS metric");

    /// 1 when the vectorizer and classifier are loaded, 0 in degraded mode
    pub static ref MODEL_LOADED: Gauge = Gauge::with_opts(
        Opts::new("model_loaded", "Whether the sentiment model is loaded")
            .namespace(NAMESPACE)
    ).expect("Failed to create MODEL_LOADED metric");

    // ============================================================================
    // Authentication Metrics
    // ============================================================================

    /// Identity provider calls
    ///
    /// Labels: operation (sign_up, sign_in, sign_out), result (success, rejected, error)
    pub static ref AUTH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("auth_requests_total", "Total number of identity provider calls")
            .namespace(NAMESPACE),
        &["operation", "result"]
    ).expect("Failed to create AUTH_REQUESTS_TOTAL metric");

    /// Sessions currently held in the session store
    pub static ref SESSIONS_ACTIVE: Gauge = Gauge::with_opts(
        Opts::new("sessions_active", "Number of live sessions")
            .namespace(NAMESPACE)
    ).expect("Failed to create SESSIONS_ACTIVE metric");

    // ============================================================================
    // System Metrics
    // ============================================================================

    /// Build information
    ///
    /// Labels: version, commit
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Build information")
            .namespace(NAMESPACE),
        &["version", "commit"]
    ).expect("Failed to create BUILD_INFO metric");
}

/// Register all metrics with the global registry.
///
/// Must be called once at startup; a second call fails with `AlreadyReg`.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(ANALYSIS_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(ANALYSIS_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(MODEL_LOADED.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(AUTH_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(SESSIONS_ACTIVE.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;

    BUILD_INFO
        .with_label_values(&[
            env!("CARGO_PKG_VERSION"),
            option_env!("GIT_COMMIT").unwrap_or("unknown"),
        ])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Gather all registered metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_update_without_registration() {
        let before = ANALYSIS_REQUESTS_TOTAL
            .with_label_values(&["metrics_unit_test"])
            .get();
        ANALYSIS_REQUESTS_TOTAL
            .with_label_values(&["metrics_unit_test"])
            .inc();
        assert_eq!(
            ANALYSIS_REQUESTS_TOTAL
                .with_label_values(&["metrics_unit_test"])
                .get(),
            before + 1.0
        );
    }

    #[test]
    fn test_gather_is_valid_text() {
        let _ = init_metrics();
        MODEL_LOADED.set(1.0);
        let output = gather_metrics();
        assert!(output.contains("review_sentiment_model_loaded"));
    }
}
