/// Authentication against the external identity provider
///
/// Credentials are checked by the provider; this module only keeps the
/// resulting sessions and maps provider failures to user-facing messages.

pub mod provider;
pub mod session;
pub mod supabase;

pub use provider::{AuthError, AuthSession, AuthUser, IdentityProvider, UnconfiguredProvider};
pub use session::{
    clear_session_cookie, read_cookie, session_cookie, run_purge_loop, Session, SessionStore,
};
pub use supabase::SupabaseAuthClient;
