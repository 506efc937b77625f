//! OAuth provider seam and types.

use async_trait::async_trait;

use super::token::TokenGrant;
use super::{CsrfToken, PkceVerifier, StateParameter};
use crate::error::Error;

/// Authorization request with URL and the values to bind to the session.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// State embedded in the URL.
    pub state: StateParameter,
    /// PKCE verifier to be stored for later code exchange.
    pub pkce_verifier: PkceVerifier,
}

impl AuthorizationRequest {
    pub fn csrf_token(&self) -> &CsrfToken {
        self.state.csrf_token()
    }
}

/// Exchanges an authorization code for tokens.
///
/// The provider recomputes the PKCE challenge from `verifier` and compares it
/// to the one it received at authorization time; a mismatch comes back as a
/// provider rejection, not a local check.
#[async_trait]
pub trait TokenExchangeClient: Send + Sync {
    /// # Arguments
    ///
    /// * `code` - Authorization code from OAuth callback
    /// * `redirect_uri` - Must match the authorization request byte for byte
    /// * `verifier` - PKCE code verifier bound to the session
    ///
    /// # Returns
    ///
    /// The token grant, or `OAuthErrorKind::ProviderRejected` with the
    /// provider's error payload.
    async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: &PkceVerifier,
    ) -> Result<TokenGrant, Error>;
}
