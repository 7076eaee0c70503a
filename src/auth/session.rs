use crate::auth::provider::{AuthSession, AuthUser};
use crate::metrics::SESSIONS_ACTIVE;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A logged-in user as seen by request handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: AuthUser,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side session table.
///
/// The browser only holds `<id>.<tag>`; the tag is derived from the session
/// secret so guessed or altered ids are rejected before the table lookup.
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    secret: String,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            secret: secret.into(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Store a new session and return the cookie token for it
    pub fn create(&self, auth: AuthSession) -> String {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            Session {
                user: auth.user,
                access_token: auth.access_token,
                created_at: Utc::now(),
            },
        );
        self.update_gauge();
        format!("{}.{}", id, self.tag(&id))
    }

    /// Look up the session behind a cookie token.
    ///
    /// Tampered, unknown and expired tokens all resolve to `None`; expired
    /// sessions are dropped on the way.
    pub fn resolve(&self, token: &str) -> Option<Session> {
        let id = self.verify(token)?;
        let session = self.sessions.get(&id)?.clone();

        if self.is_expired(&session, Utc::now()) {
            self.sessions.remove(&id);
            self.update_gauge();
            return None;
        }

        Some(session)
    }

    /// Remove the session behind a cookie token
    pub fn remove(&self, token: &str) -> Option<Session> {
        let id = self.verify(token)?;
        let removed = self.sessions.remove(&id).map(|(_, s)| s);
        self.update_gauge();
        removed
    }

    /// Drop every expired session, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !self.is_expired(s, now));
        self.update_gauge();
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.created_at) >= self.ttl
    }

    fn verify(&self, token: &str) -> Option<Uuid> {
        let (id, tag) = token.split_once('.')?;
        let id = Uuid::parse_str(id).ok()?;
        constant_time_eq(tag.as_bytes(), self.tag(&id).as_bytes()).then_some(id)
    }

    fn tag(&self, id: &Uuid) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b":");
        hasher.update(id.as_bytes());
        Base64UrlUnpadded::encode_string(&hasher.finalize())
    }

    fn update_gauge(&self) {
        SESSIONS_ACTIVE.set(self.sessions.len() as f64);
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Periodically purge expired sessions; runs until the task is dropped
pub async fn run_purge_loop(store: Arc<SessionStore>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let purged = store.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = store.len(), "Purged expired sessions");
        }
    }
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(name: &str, token: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        token,
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes the session cookie
pub fn clear_session_cookie(name: &str, secure: bool) -> String {
    session_cookie(name, "", Duration::ZERO, secure)
}

/// Find a cookie value in a `Cookie` request header
pub fn read_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
