use crate::api::AppState;
use crate::auth::{read_cookie, Session};
use crate::error::AppError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::Redirect,
};

/// Session cookie token from the request, if any
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| read_cookie(value, cookie_name))
}

fn session_from_parts(parts: &Parts, state: &AppState) -> Option<Session> {
    let token = session_token(&parts.headers, &state.settings.session_cookie)?;
    state.sessions.resolve(token)
}

/// Logged-in user for HTML routes; anonymous requests are redirected to `/login`
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, state)
            .map(CurrentUser)
            .ok_or_else(|| Redirect::to("/login"))
    }
}

/// Logged-in user for JSON routes; anonymous requests get 401
#[derive(Debug, Clone)]
pub struct ApiUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for ApiUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, state)
            .map(ApiUser)
            .ok_or_else(|| AppError::Authentication("login required".to_string()))
    }
}
