use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Session secret used when nothing is configured. Only suitable for local development.
pub const INSECURE_DEFAULT_SECRET: &str = "default-secret-key";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Identity provider and session configuration
    pub auth: AuthConfig,

    /// Trained artifact locations
    pub artifacts: ArtifactConfig,

    /// Prediction pipeline behaviour
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(std::env::var("CONFIG_PATH").ok().as_deref())
    }

    /// Load configuration with an explicit file; `None` means `config/default.toml`
    pub fn load_from(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let config_path = path.unwrap_or("config/default.toml");

        let mut config: Config = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: REVIEW_SENTIMENT__)
            .add_source(
                config::Environment::with_prefix("REVIEW_SENTIMENT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.apply_provider_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply the well-known provider variables (`SUPABASE_URL`, `SUPABASE_KEY`, `SECRET_KEY`).
    ///
    /// These win over file values so a deployment only needs the three variables.
    pub fn apply_provider_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("SUPABASE_URL") {
            self.auth.provider_url = Some(url);
        }
        if let Some(key) = non_empty("SUPABASE_KEY") {
            self.auth.provider_key = Some(key);
        }
        if let Some(secret) = non_empty("SECRET_KEY") {
            self.auth.session_secret = secret;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Externally visible base URL, used for email confirmation links.
    /// Falls back to the request `Host` header when unset.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identity provider base URL
    #[serde(default)]
    pub provider_url: Option<String>,

    /// Identity provider API key
    #[serde(default)]
    pub provider_key: Option<String>,

    /// Secret used to tag session cookies
    #[serde(default = "default_session_secret")]
    pub session_secret: String,

    /// Session cookie name
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Session lifetime (seconds)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookies: bool,

    /// Provider request timeout (seconds)
    #[serde(default = "default_provider_timeout")]
    pub request_timeout_secs: u64,
}

impl AuthConfig {
    /// Both URL and key are present
    pub fn provider_configured(&self) -> bool {
        matches!((&self.provider_url, &self.provider_key), (Some(u), Some(k)) if !u.is_empty() && !k.is_empty())
    }

    pub fn uses_insecure_secret(&self) -> bool {
        self.session_secret == INSECURE_DEFAULT_SECRET
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider_url: None,
            provider_key: None,
            session_secret: default_session_secret(),
            session_cookie: default_session_cookie(),
            session_ttl_secs: default_session_ttl(),
            secure_cookies: false,
            request_timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory holding the artifacts; relative paths resolve against the application root
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_vectorizer_file")]
    pub vectorizer_file: String,

    #[serde(default = "default_classifier_file")]
    pub classifier_file: String,
}

impl ArtifactConfig {
    /// Artifact directory, with relative paths joined onto `app_root`.
    pub fn resolved_dir(&self, app_root: &Path) -> PathBuf {
        if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            app_root.join(&self.dir)
        }
    }

    pub fn vectorizer_path(&self, app_root: &Path) -> PathBuf {
        self.resolved_dir(app_root).join(&self.vectorizer_file)
    }

    pub fn classifier_path(&self, app_root: &Path) -> PathBuf {
        self.resolved_dir(app_root).join(&self.classifier_file)
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
            vectorizer_file: default_vectorizer_file(),
            classifier_file: default_classifier_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Pause before inference (milliseconds)
    #[serde(default = "default_pacing_delay")]
    pub pacing_delay_ms: u64,
}

impl AnalysisConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pacing_delay_ms: default_pacing_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_session_secret() -> String {
    INSECURE_DEFAULT_SECRET.to_string()
}

fn default_session_cookie() -> String {
    "review_session".to_string()
}

fn default_session_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_vectorizer_file() -> String {
    "tfidf_vectorizer.json".to_string()
}

fn default_classifier_file() -> String {
    "best_model.json".to_string()
}

fn default_pacing_delay() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
