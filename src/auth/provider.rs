use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message the provider uses for a wrong email/password pair
const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// Identity confirmed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Result of a successful password sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: AuthUser,
    /// Provider token, needed to revoke the session on logout
    pub access_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Provider URL or key missing from configuration
    #[error("Authentication service is not configured.")]
    NotConfigured,

    /// The provider refused the request
    #[error("{0}")]
    Rejected(String),

    /// The provider could not be reached
    #[error("Authentication service unreachable: {0}")]
    Transport(String),

    /// The provider answered with something unexpected
    #[error("Unexpected response from authentication service: {0}")]
    Protocol(String),
}

impl AuthError {
    /// Message safe to show on the login and signup pages
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected(msg) if msg.contains(INVALID_CREDENTIALS) => {
                "Invalid email or password. Please try again.".to_string()
            }
            AuthError::Rejected(msg) => msg.clone(),
            AuthError::NotConfigured => self.to_string(),
            AuthError::Transport(_) | AuthError::Protocol(_) => {
                "Authentication service unavailable. Please try again later.".to_string()
            }
        }
    }

    /// Metric label for this failure
    pub fn result_label(&self) -> &'static str {
        match self {
            AuthError::Rejected(_) => "rejected",
            _ => "error",
        }
    }
}

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register an account; the provider emails a confirmation link to `redirect_to`
    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<(), AuthError>;

    /// Exchange credentials for a session
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Revoke a session at the provider
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// Stand-in used when the provider is not configured; every call fails with
/// [`AuthError::NotConfigured`].
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl IdentityProvider for UnconfiguredProvider {
    async fn sign_up(&self, _email: &str, _password: &str, _redirect_to: &str) -> Result<(), AuthError> {
        Err(AuthError::NotConfigured)
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> Result<AuthSession, AuthError> {
        Err(AuthError::NotConfigured)
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        Err(AuthError::NotConfigured)
    }
}
