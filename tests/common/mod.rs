//! Shared fixtures for the integration tests
//!
//! Provides a small trained model, a scripted identity provider and a
//! router wired the same way the server wires it, plus helpers for
//! reading Prometheus exposition output.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use ndarray::array;
use review_sentiment::{
    api::{build_router, AppState, HtmlRenderer, WebSettings},
    auth::{AuthError, AuthSession, AuthUser, IdentityProvider, SessionStore},
    ml::{LinearClassifier, LoadedModel, ModelState, PredictionPipeline, TfidfVectorizer},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

pub const TEST_EMAIL: &str = "reviewer@example.com";
pub const TEST_PASSWORD: &str = "correct-horse";
pub const SESSION_COOKIE: &str = "review_session";

/// Three-class model over a two-word vocabulary: "great" reads positive,
/// "terrible" reads negative, anything else is a three-way tie.
pub fn sentiment_model() -> LoadedModel {
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

    LoadedModel::new(Arc::new(vectorizer), Arc::new(classifier)).unwrap()
}

/// Every call made to a [`ScriptedIdentity`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityCall {
    SignUp { email: String, redirect_to: String },
    SignIn { email: String },
    SignOut { access_token: String },
}

/// Identity provider that accepts exactly one email/password pair
#[derive(Default)]
pub struct ScriptedIdentity {
    pub calls: Mutex<Vec<IdentityCall>>,
    /// Make `sign_out` fail the way an unreachable provider does
    pub fail_sign_out: bool,
}

impl ScriptedIdentity {
    pub fn calls(&self) -> Vec<IdentityCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: IdentityCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn sign_up(&self, email: &str, _password: &str, redirect_to: &str) -> Result<(), AuthError> {
        self.record(IdentityCall::SignUp {
            email: email.to_string(),
            redirect_to: redirect_to.to_string(),
        });

        if email == TEST_EMAIL {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        Ok(())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.record(IdentityCall::SignIn {
            email: email.to_string(),
        });

        if email == TEST_EMAIL && password == TEST_PASSWORD {
            Ok(AuthSession {
                user: AuthUser {
                    id: "user-1".to_string(),
                    email: email.to_string(),
                },
                access_token: "provider-access-token".to_string(),
            })
        } else {
            Err(AuthError::Rejected("Invalid login credentials".to_string()))
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.record(IdentityCall::SignOut {
            access_token: access_token.to_string(),
        });

        if self.fail_sign_out {
            return Err(AuthError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Router plus handles on the pieces tests want to inspect
pub struct TestApp {
    pub router: Router,
    pub identity: Arc<ScriptedIdentity>,
    pub sessions: Arc<SessionStore>,
}

impl TestApp {
    pub fn new(model: ModelState) -> Self {
        Self::with_identity(model, ScriptedIdentity::default())
    }

    pub fn with_identity(model: ModelState, identity: ScriptedIdentity) -> Self {
        let identity = Arc::new(identity);
        let sessions = Arc::new(SessionStore::new("test-secret", Duration::from_secs(3600)));
        let state = AppState::new(
            PredictionPipeline::new(model, Duration::ZERO),
            identity.clone(),
            sessions.clone(),
            Arc::new(HtmlRenderer::new().unwrap()),
            WebSettings::default(),
        );

        Self {
            router: build_router(state, Duration::from_secs(5)),
            identity,
            sessions,
        }
    }

    pub fn ready() -> Self {
        Self::new(sentiment_model().into())
    }

    pub fn degraded() -> Self {
        Self::new(ModelState::Degraded {
            reason: "Artifact not found: models/best_model.json".to_string(),
        })
    }

    /// Send one request through a clone of the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Log in with the accepted credentials and return the `Cookie` header value
    pub async fn login(&self) -> String {
        let response = self
            .send(form_post(
                "/login",
                &format!("email={}&password={}", urlencode(TEST_EMAIL), TEST_PASSWORD),
                None,
            ))
            .await;

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("login should set a cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn json_post(uri: &str, body: serde_json::Value, cookie: Option<&str>) -> Request<Body> {
    raw_json_post(uri, &body.to_string(), cookie)
}

/// JSON request with a body that need not parse
pub fn raw_json_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// Minimal form encoding for the characters the tests use
pub fn urlencode(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('@', "%40")
        .replace('&', "%26")
        .replace('=', "%3D")
        .replace('<', "%3C")
        .replace('>', "%3E")
        .replace(' ', "+")
}

/// Register the global metrics once per test binary.
///
/// Concurrent callers wait until registration has finished.
pub fn init_test_metrics() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = review_sentiment::metrics::init_metrics();
    });
}

/// Extract metric value from a Prometheus output line
/// Example: `metric_name{label1="value1"} 42.5` -> Some(42.5)
pub fn extract_metric_value(line: &str) -> Option<f64> {
    line.split_whitespace().last()?.parse::<f64>().ok()
}

/// Extract labels from a Prometheus metric line
/// Example: `metric{a="1",b="2"}` -> HashMap{"a" -> "1", "b" -> "2"}
pub fn extract_labels(line: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();

    if let (Some(start), Some(end)) = (line.find('{'), line.find('}')) {
        for pair in line[start + 1..end].split(',') {
            if let Some((key, value)) = pair.split_once('=') {
                labels.insert(key.trim().to_string(), value.trim().trim_matches('"').to_string());
            }
        }
    }

    labels
}

/// Value of the first sample of `metric` whose labels include all of `wanted`
pub fn sample_value(output: &str, metric: &str, wanted: &[(&str, &str)]) -> Option<f64> {
    output
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| line.starts_with(&format!("{}{{", metric)) || line.starts_with(&format!("{} ", metric)))
        .find(|line| {
            let labels = extract_labels(line);
            wanted
                .iter()
                .all(|(k, v)| labels.get(*k).map(String::as_str) == Some(*v))
        })
        .and_then(extract_metric_value)
}

/// Validate that a Prometheus exposition format output is well-formed
pub fn validate_exposition_format(output: &str) -> Result<(), String> {
    let lines: Vec<&str> = output.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();

        // HELP line should be followed by TYPE line for the same metric
        if line.starts_with("# HELP") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return Err(format!("Line {}: Invalid HELP format", i + 1));
            }

            let next = lines.get(i + 1).map(|l| l.trim()).unwrap_or("");
            if !next.starts_with(&format!("# TYPE {}", parts[2])) {
                return Err(format!(
                    "Line {}: HELP not followed by TYPE for metric {}",
                    i + 1,
                    parts[2]
                ));
            }
        }

        if line.starts_with("# TYPE") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let valid_types = ["counter", "gauge", "histogram", "summary", "untyped"];
            if parts.len() < 4 || !valid_types.contains(&parts[3]) {
                return Err(format!("Line {}: Invalid TYPE line '{}'", i + 1, line));
            }
        }
    }

    Ok(())
}
