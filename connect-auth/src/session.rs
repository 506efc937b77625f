//! Short-lived values bound to the user agent between the authorize redirect
//! and the provider callback.

use std::time::Duration;

/// How long authorization session values live when unused.
pub const SESSION_TTL: Duration = Duration::from_secs(600);

/// Name of the scoped value holding the CSRF token.
pub const CSRF_KEY: &str = "tt_csrf";

/// Name of the scoped value holding the PKCE verifier.
pub const PKCE_KEY: &str = "tt_pkce";

/// Attributes applied to every scoped value written by the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionScope {
    /// Lifetime of the value. `Duration::ZERO` expires it immediately.
    pub max_age: Duration,
    /// Only send the value over HTTPS.
    pub secure: bool,
}

impl SessionScope {
    /// Scope for freshly issued authorization values.
    pub fn issue(secure: bool) -> Self {
        Self {
            max_age: SESSION_TTL,
            secure,
        }
    }

    /// Scope used to invalidate a value. Same attributes, zero lifetime.
    pub fn expire(secure: bool) -> Self {
        Self {
            max_age: Duration::ZERO,
            secure,
        }
    }
}

/// Capability for storing values scoped to the current user agent.
///
/// Cookies are the production mechanism, but the flow only depends on this
/// trait so signed tokens or a server-side session store can replace them.
pub trait SessionStore {
    /// Bind `value` to the user agent under `name`.
    fn set(&mut self, name: &'static str, value: String, scope: SessionScope);

    /// Read a value bound by a previous request. Empty values read as absent.
    fn get(&self, name: &str) -> Option<String>;

    /// Invalidate `name` so it cannot be read again.
    fn clear(&mut self, name: &'static str, secure: bool);
}
