//! Domain layer for linking creators to their TikTok accounts.
//!
//! `creator_connection` drives the two halves of the OAuth handshake; the
//! `gateway` module holds the outbound integrations it talks to.

// Re-exported so `web` does not need a direct dependency on `connect-auth`.
pub use connect_auth::session::{SessionScope, SessionStore, CSRF_KEY, PKCE_KEY};

pub mod creator_connection;
pub mod error;

pub mod gateway;
