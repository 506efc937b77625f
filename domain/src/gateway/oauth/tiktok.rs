//! TikTok OAuth client.
//!
//! Provides configured TikTok endpoints for the creator connection flow.

use crate::error::{ConfigErrorKind, Error};
use connect_auth::http::ClientBuilder;
use connect_auth::oauth::providers::tiktok::{AuthorizeEndpoint, Provider as TikTokProvider};
use log::*;
use secrecy::SecretString;
use service::config::Config;

/// Create the authorization endpoint for `client_key`.
///
/// The caller resolves the client key itself since a missing key means a
/// different thing on each side of the handshake.
pub fn new_authorize_endpoint(config: &Config, client_key: String) -> AuthorizeEndpoint {
    AuthorizeEndpoint::new(
        config.tiktok_authorize_url().to_string(),
        client_key,
        config.tiktok_scopes().to_string(),
    )
}

/// Create a TikTok token client from config.
///
/// # Returns
///
/// A provider ready to exchange authorization codes, or a configuration error
/// when the client key or secret is missing.
///
/// # Example
///
/// ```rust,ignore
/// use domain::gateway::oauth::tiktok;
///
/// let provider = tiktok::new_provider(&config)?;
/// let grant = provider.exchange(code, &redirect_uri, &verifier).await?;
/// ```
pub fn new_provider(config: &Config) -> Result<TikTokProvider, Error> {
    let (client_key, client_secret) = config
        .tiktok_client_key()
        .zip(config.tiktok_client_secret())
        .ok_or_else(|| {
            error!("TIKTOK_CLIENT_KEY or TIKTOK_CLIENT_SECRET is not configured");
            Error::config(ConfigErrorKind::MissingClientCredentials)
        })?;

    let http_client = ClientBuilder::new().build()?;

    Ok(TikTokProvider::new(
        client_key,
        SecretString::new(client_secret),
        config.tiktok_token_url().to_string(),
        http_client,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};
    use clap::Parser;

    #[test]
    fn test_new_provider_requires_secret() {
        let config = Config::parse_from(["creator_connect", "--tiktok-client-key", "ck"]);
        let err = new_provider(&config).err().unwrap();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config(
                ConfigErrorKind::MissingClientCredentials
            ))
        );
    }

    #[test]
    fn test_new_provider_with_credentials() {
        let config = Config::parse_from([
            "creator_connect",
            "--tiktok-client-key",
            "ck",
            "--tiktok-client-secret",
            "cs",
        ]);
        assert!(new_provider(&config).is_ok());
    }
}
