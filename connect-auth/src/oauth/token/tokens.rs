//! OAuth token types.

use crate::error::{oauth_error, Error, OAuthErrorKind};
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde::Deserialize;

/// Successful token endpoint response, with lifetimes relative to issue time.
#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    pub access_token: SecretString,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub open_id: String,
    pub refresh_token: SecretString,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
    pub scope: String,
    pub token_type: String,
    #[serde(default)]
    pub log_id: Option<String>,
}

impl TokenGrant {
    /// Pin the relative lifetimes to absolute timestamps, counted from `now`.
    ///
    /// A negative lifetime, or one that overflows the calendar, is treated as
    /// a malformed token response.
    pub fn into_bundle(self, now: DateTime<Utc>) -> Result<TokenBundle, Error> {
        let expires_at = expiry_after(now, self.expires_in, "expires_in")?;
        let refresh_expires_at = expiry_after(now, self.refresh_expires_in, "refresh_expires_in")?;

        Ok(TokenBundle {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            open_id: self.open_id,
            scope: self.scope,
            token_type: self.token_type,
            expires_at,
            refresh_expires_at,
        })
    }
}

fn expiry_after(now: DateTime<Utc>, seconds: i64, field: &str) -> Result<DateTime<Utc>, Error> {
    (seconds >= 0)
        .then(|| TimeDelta::try_seconds(seconds))
        .flatten()
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::InvalidResponse,
                &format!("{field} out of range: {seconds}"),
            )
        })
}

/// Tokens for one creator connection, ready to be persisted.
#[derive(Debug, Clone)]
pub struct TokenBundle {
    /// Access token for API requests.
    pub access_token: SecretString,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: SecretString,
    /// Provider's identifier for the connected account.
    pub open_id: String,
    /// Granted scopes, as returned by the provider.
    pub scope: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
    /// When the refresh token expires.
    pub refresh_expires_at: DateTime<Utc>,
}
