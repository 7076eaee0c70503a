use crate::api::{handlers, AppState};
use crate::metrics::track_http_metrics;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the application router
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Pages
        .route("/", get(handlers::intro))
        .route("/signup", get(handlers::signup_page).post(handlers::signup))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout).post(handlers::logout))
        .route("/analyze", get(handlers::analyze_page).post(handlers::analyze))
        // JSON API
        .route("/v1/analyze", post(handlers::analyze_api))
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        // Wraps every route and the 404 fallback; only matched routes carry a MatchedPath
        .layer(middleware::from_fn(track_http_metrics))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new()),
        )
}
