pub mod extract;
pub mod handlers;
pub mod routes;
pub mod views;

pub use extract::{ApiUser, CurrentUser};
pub use routes::*;
pub use views::{HtmlRenderer, ViewRenderer};

use crate::auth::{IdentityProvider, SessionStore};
use crate::config::Config;
use crate::ml::PredictionPipeline;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cookie and URL settings the handlers need at request time
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub session_cookie: String,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
    /// Base URL for links sent in emails; taken from the request when unset
    pub public_base_url: Option<String>,
}

impl WebSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_cookie: config.auth.session_cookie.clone(),
            session_ttl: config.auth.session_ttl(),
            secure_cookies: config.auth.secure_cookies,
            public_base_url: config.server.public_base_url.clone(),
        }
    }
}

impl Default for WebSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PredictionPipeline,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<SessionStore>,
    pub views: Arc<dyn ViewRenderer>,
    pub settings: Arc<WebSettings>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        pipeline: PredictionPipeline,
        identity: Arc<dyn IdentityProvider>,
        sessions: Arc<SessionStore>,
        views: Arc<dyn ViewRenderer>,
        settings: WebSettings,
    ) -> Self {
        Self {
            pipeline,
            identity,
            sessions,
            views,
            settings: Arc::new(settings),
            started_at: Instant::now(),
        }
    }
}
