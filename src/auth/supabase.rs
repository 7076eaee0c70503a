use crate::auth::provider::{AuthError, AuthSession, AuthUser, IdentityProvider};
use crate::metrics::AUTH_REQUESTS_TOTAL;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for a Supabase (GoTrue) auth endpoint
#[derive(Clone)]
pub struct SupabaseAuthClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// The different shapes GoTrue uses for error bodies
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorPayload {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
    }
}

impl SupabaseAuthClient {
    /// Create a new client for `base_url` (the project URL, without `/auth/v1`)
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AuthError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn map_send_error(e: reqwest::Error) -> AuthError {
        if e.is_timeout() {
            AuthError::Transport("request timed out".to_string())
        } else {
            AuthError::Transport(e.to_string())
        }
    }

    /// Turn a non-2xx response into an error carrying the provider's message
    async fn rejection(response: Response) -> AuthError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorPayload>(&body)
            .ok()
            .and_then(ErrorPayload::into_message);

        match message {
            Some(msg) if status.is_client_error() => AuthError::Rejected(msg),
            Some(msg) => AuthError::Protocol(format!("{}: {}", status, msg)),
            None => AuthError::Protocol(format!("{} with unreadable body", status)),
        }
    }

    fn record<T>(operation: &str, result: &Result<T, AuthError>) {
        let label = match result {
            Ok(_) => "success",
            Err(e) => e.result_label(),
        };
        AUTH_REQUESTS_TOTAL
            .with_label_values(&[operation, label])
            .inc();
    }
}

impl SupabaseAuthClient {
    async fn request_sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("signup"))
            .query(&[("redirect_to", redirect_to)])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        debug!(email = %email, "Signup accepted, confirmation email pending");
        Ok(())
    }

    async fn request_token(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Protocol(format!("invalid token response: {}", e)))?;

        Ok(AuthSession {
            user: AuthUser {
                id: token.user.id,
                email: token.user.email.unwrap_or_else(|| email.to_string()),
            },
            access_token: token.access_token,
        })
    }

    async fn request_logout(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            let err = Self::rejection(response).await;
            warn!(error = %err, "Provider refused sign-out");
            return Err(err);
        }

        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthClient {
    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<(), AuthError> {
        let result = self.request_sign_up(email, password, redirect_to).await;
        Self::record("sign_up", &result);
        result
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let result = self.request_token(email, password).await;
        Self::record("sign_in", &result);
        result
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let result = self.request_logout(access_token).await;
        Self::record("sign_out", &result);
        result
    }
}
