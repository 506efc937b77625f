//! TikTok OAuth provider implementation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};
use crate::oauth::token::TokenGrant;
use crate::oauth::{
    AuthorizationRequest, CsrfToken, PkceVerifier, StateParameter, TokenExchangeClient,
    CHALLENGE_METHOD,
};
use crate::random::RandomSource;

/// Production authorization endpoint.
pub const AUTHORIZE_URL: &str = "https://www.tiktok.com/v2/auth/authorize/";

/// Production token endpoint.
pub const TOKEN_URL: &str = "https://open.tiktokapis.com/v2/oauth/token/";

/// Scopes requested for every connection.
pub const DEFAULT_SCOPES: &str = "user.info.basic,video.upload,video.publish";

/// Builds the URL that sends the user agent to TikTok's consent screen.
#[derive(Debug, Clone)]
pub struct AuthorizeEndpoint {
    url: String,
    client_key: String,
    scopes: String,
}

impl AuthorizeEndpoint {
    /// # Arguments
    ///
    /// * `url` - Authorization endpoint, usually [`AUTHORIZE_URL`]
    /// * `client_key` - TikTok client key
    /// * `scopes` - Comma separated scope list, usually [`DEFAULT_SCOPES`]
    pub fn new(url: String, client_key: String, scopes: String) -> Self {
        Self {
            url,
            client_key,
            scopes,
        }
    }

    /// Generate a fresh CSRF token and PKCE pair and build the authorization URL.
    ///
    /// # Arguments
    ///
    /// * `creator_key` - Creator the connection attempt belongs to
    /// * `redirect_uri` - Callback URI, reused verbatim at code exchange
    /// * `random` - Source for the CSRF token and PKCE verifier
    pub fn authorization_request<R: RandomSource + ?Sized>(
        &self,
        creator_key: &str,
        redirect_uri: &str,
        random: &R,
    ) -> Result<AuthorizationRequest, Error> {
        let state = StateParameter::new(creator_key, CsrfToken::generate(random));
        let pkce_verifier = PkceVerifier::generate(random);
        let challenge = pkce_verifier.challenge();

        let mut url = Url::parse(&self.url).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidEndpoint),
        })?;

        url.query_pairs_mut()
            .append_pair("client_key", &self.client_key)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", &state.to_string())
            .append_pair("code_challenge", challenge.as_str())
            .append_pair("code_challenge_method", CHALLENGE_METHOD)
            .append_pair("disable_auto_auth", "1");

        debug!("Built TikTok authorization URL for creator {}", creator_key);

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
            pkce_verifier,
        })
    }
}

/// Form body for the authorization code grant.
#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    client_key: &'a str,
    client_secret: &'a str,
    code: &'a str,
    grant_type: &'static str,
    redirect_uri: &'a str,
    code_verifier: &'a str,
}

/// TikTok token endpoint client.
pub struct Provider {
    client_key: String,
    client_secret: SecretString,
    token_url: String,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new TikTok token client.
    ///
    /// # Arguments
    ///
    /// * `client_key` - TikTok client key
    /// * `client_secret` - TikTok client secret
    /// * `token_url` - Token endpoint, usually [`TOKEN_URL`]
    /// * `http_client` - Client used for the exchange request
    pub fn new(
        client_key: String,
        client_secret: SecretString,
        token_url: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            client_key,
            client_secret,
            token_url,
            http_client,
        }
    }
}

/// Loose truthiness of the `error` field, which TikTok omits, nulls or
/// empties on success depending on the API version.
fn carries_error(body: &serde_json::Value) -> bool {
    match body.get("error") {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Bool(b)) => *b,
        Some(_) => true,
    }
}

#[async_trait]
impl TokenExchangeClient for Provider {
    async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: &PkceVerifier,
    ) -> Result<TokenGrant, Error> {
        let request = TokenExchangeRequest {
            client_key: &self.client_key,
            client_secret: self.client_secret.expose_secret(),
            code,
            grant_type: "authorization_code",
            redirect_uri,
            code_verifier: verifier.as_str(),
        };

        debug!("Exchanging TikTok authorization code for tokens");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&request)
            .send()
            .await
            .inspect_err(|e| warn!("Failed to reach TikTok token endpoint: {:?}", e))?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(|e| {
            warn!("TikTok token endpoint returned a non-JSON body ({})", status);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })?;

        if carries_error(&body) || !status.is_success() {
            warn!("TikTok rejected the code exchange ({}): {}", status, body);
            return Err(Error {
                source: Some(format!("token endpoint answered {status}").into()),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::ProviderRejected(body)),
            });
        }

        let grant: TokenGrant = serde_json::from_value(body).map_err(|e| {
            warn!("Failed to parse TikTok token response: {:?}", e);
            oauth_error(
                OAuthErrorKind::InvalidResponse,
                &format!("Invalid token response from TikTok: {e}"),
            )
        })?;

        info!(
            "Exchanged TikTok authorization code for open_id {}",
            grant.open_id
        );
        Ok(grant)
    }
}
