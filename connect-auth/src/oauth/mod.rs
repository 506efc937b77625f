//! OAuth 2.0 authentication infrastructure.
//!
//! Provides the authorization code flow with PKCE security for linking creator accounts.

mod pkce;
mod provider;
mod state;

pub mod providers;
pub mod token;

pub use pkce::{PkceChallenge, PkceVerifier, CHALLENGE_METHOD};
pub use provider::{AuthorizationRequest, TokenExchangeClient};
pub use state::{CsrfToken, StateParameter};
