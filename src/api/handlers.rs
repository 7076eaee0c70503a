use crate::api::views::{AnalyzeView, FormView};
use crate::api::{extract::session_token, ApiUser, AppState, CurrentUser};
use crate::auth::{clear_session_cookie, session_cookie};
use crate::error::Result;
use crate::metrics::gather_metrics;
use crate::ml::PredictionResult;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

/// Shown after a successful signup
const SIGNUP_SUCCESS: &str = "Verification email sent! Please check your inbox.";

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        model_loaded: state.pipeline.model_state().is_ready(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_loaded: bool,
}

/// Readiness: 503 while the model is in degraded mode
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let model = state.pipeline.model_state();
    let (status, label) = if model.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(ReadinessResponse {
            status: label.to_string(),
            model_loaded: model.is_ready(),
            reason: model.degraded_reason().map(str::to_string),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Prometheus scrape endpoint
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

/// Landing page
pub async fn intro(State(state): State<AppState>, user: Option<CurrentUser>) -> Result<Html<String>> {
    let user = user.map(|CurrentUser(session)| session.user);
    Ok(Html(state.views.intro(user.as_ref())?))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CredentialsForm {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter your password."))]
    pub password: String,
}

impl CredentialsForm {
    fn check(&self) -> std::result::Result<(), String> {
        self.validate().map_err(|e| first_message(&e))
    }
}

/// First validation message, email before password
fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    ["email", "password"]
        .iter()
        .filter_map(|field| fields.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input.".to_string())
}

pub async fn signup_page(State(state): State<AppState>) -> Result<Html<String>> {
    Ok(Html(state.views.signup(&FormView::default())?))
}

/// Register with the identity provider; the provider sends the confirmation email
pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CredentialsForm>,
) -> Result<Html<String>> {
    if let Err(message) = form.check() {
        return Ok(Html(state.views.signup(&FormView::error(message, Some(form.email)))?));
    }

    let redirect_to = format!("{}/login", base_url(&state, &headers));

    let view = match state
        .identity
        .sign_up(&form.email, &form.password, &redirect_to)
        .await
    {
        Ok(()) => {
            info!(email = %form.email, "Signup requested");
            FormView::success(SIGNUP_SUCCESS)
        }
        Err(e) => {
            warn!(email = %form.email, error = %e, "Signup failed");
            FormView::error(e.user_message(), Some(form.email))
        }
    };

    Ok(Html(state.views.signup(&view)?))
}

pub async fn login_page(State(state): State<AppState>) -> Result<Html<String>> {
    Ok(Html(state.views.login(&FormView::default())?))
}

/// Password login; on success a session cookie is set and the user lands on `/analyze`
pub async fn login(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Result<Response> {
    if let Err(message) = form.check() {
        return Ok(Html(state.views.login(&FormView::error(message, Some(form.email)))?).into_response());
    }

    match state
        .identity
        .sign_in_with_password(&form.email, &form.password)
        .await
    {
        Ok(auth) => {
            info!(user_id = %auth.user.id, "User logged in");
            let token = state.sessions.create(auth);
            let cookie = session_cookie(
                &state.settings.session_cookie,
                &token,
                state.settings.session_ttl,
                state.settings.secure_cookies,
            );
            Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/analyze")).into_response())
        }
        Err(e) => {
            warn!(error = %e, "Login failed");
            let html = state.views.login(&FormView::error(e.user_message(), Some(form.email)))?;
            Ok(Html(html).into_response())
        }
    }
}

/// Drop the session locally and at the provider, then go back to the landing page
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers, &state.settings.session_cookie) {
        if let Some(session) = state.sessions.remove(token) {
            if let Err(e) = state.identity.sign_out(&session.access_token).await {
                warn!(user_id = %session.user.id, error = %e, "Provider sign-out failed");
            }
            info!(user_id = %session.user.id, "User logged out");
        }
    }

    let cookie = clear_session_cookie(&state.settings.session_cookie, state.settings.secure_cookies);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub review: String,
}

/// Empty analysis form
pub async fn analyze_page(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Html<String>> {
    let html = state.views.analyze(&AnalyzeView {
        user: &session.user,
        review: "",
        result: None,
    })?;
    Ok(Html(html))
}

/// Run the prediction pipeline on the submitted review
pub async fn analyze(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Form(form): Form<ReviewForm>,
) -> Result<Html<String>> {
    let result = state.pipeline.analyze(&form.review).await;

    let html = state.views.analyze(&AnalyzeView {
        user: &session.user,
        review: &form.review,
        result: Some(&result),
    })?;
    Ok(Html(html))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub review: String,
}

/// JSON variant of `POST /analyze`; unreadable bodies are a 400
pub async fn analyze_api(
    State(state): State<AppState>,
    _user: ApiUser,
    request: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>> {
    let Json(request) = request?;
    Ok(Json(state.pipeline.analyze(&request.review).await))
}

/// Scheme and host the user reached us on
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.settings.public_base_url {
        return url.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or(if state.settings.secure_cookies { "https" } else { "http" });

    format!("{}://{}", scheme, host)
}
