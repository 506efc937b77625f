//! CSRF tokens and the composite `state` parameter for OAuth flows.
//!
//! The state carries `{creator_key}|{csrf_token}` through the provider. The
//! CSRF half is also bound to the user agent, so the callback can prove it is
//! completing a flow that this browser started.

use std::fmt;

use crate::error::{oauth_error, session_error, Error, OAuthErrorKind, SessionErrorKind};
use crate::random::{random_bytes, RandomSource};

const CSRF_BYTES: usize = 16;
const SEPARATOR: char = '|';

/// Single-use random value proving the callback belongs to this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Generate a token from 16 random bytes, hex encoded (32 characters).
    pub fn generate<R: RandomSource + ?Sized>(random: &R) -> Self {
        let bytes: [u8; CSRF_BYTES] = random_bytes(random);
        Self(hex::encode(bytes))
    }

    pub fn from_string(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against the value bound to the session.
    ///
    /// A missing session value never matches.
    pub fn verify(&self, bound: Option<&str>) -> Result<(), Error> {
        match bound {
            Some(value) if value == self.0 => Ok(()),
            Some(_) => Err(session_error(
                SessionErrorKind::CsrfMismatch,
                "CSRF token in state does not match the session",
            )),
            None => Err(session_error(
                SessionErrorKind::CsrfMismatch,
                "No CSRF token bound to the session",
            )),
        }
    }
}

/// The `state` value round-tripped through the authorization server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateParameter {
    creator_key: String,
    csrf_token: CsrfToken,
}

impl StateParameter {
    pub fn new(creator_key: impl Into<String>, csrf_token: CsrfToken) -> Self {
        Self {
            creator_key: creator_key.into(),
            csrf_token,
        }
    }

    /// Split a returned state into its creator key and CSRF token.
    ///
    /// Splits on the last separator: CSRF tokens are hex and never contain
    /// one, so a creator key that does survives the round trip unmodified.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let (creator_key, csrf) = raw.rsplit_once(SEPARATOR).ok_or_else(|| {
            oauth_error(OAuthErrorKind::InvalidState, "State has no separator")
        })?;

        if creator_key.is_empty() || csrf.is_empty() {
            return Err(oauth_error(
                OAuthErrorKind::InvalidState,
                "State has an empty component",
            ));
        }

        Ok(Self::new(creator_key, CsrfToken::from_string(csrf.to_string())))
    }

    pub fn creator_key(&self) -> &str {
        &self.creator_key
    }

    pub fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

impl fmt::Display for StateParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.creator_key, SEPARATOR, self.csrf_token.as_str())
    }
}
