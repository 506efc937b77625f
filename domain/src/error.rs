//! Error types for the `domain` layer.
use connect_auth::error::{
    Error as ConnectAuthError, ErrorKind as ConnectAuthErrorKind, HttpErrorKind, OAuthErrorKind,
    SessionErrorKind, TokenErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `connect-auth`, and `web` is dependent on `domain`,
/// but `web` should not be dependent, directly, on `connect-auth`. The various `error_kind`s are used
/// by `web` to return appropriate HTTP status codes and error codes to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    /// The caller sent something we cannot act on.
    Request(RequestErrorKind),
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Rejections of the incoming request. None of these is worth retrying as-is.
#[derive(Debug, PartialEq)]
pub enum RequestErrorKind {
    InvalidRequest,
    MissingCodeOrState,
    InvalidState,
    CsrfMismatch,
    MissingPkceVerifier,
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config(ConfigErrorKind),
    Other(String),
}

/// Configuration a request needed but did not find.
#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    MissingBaseUrl,
    MissingClientCredentials,
    MissingRecordStore,
    InvalidProviderEndpoint,
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// The provider answered with an error payload, kept verbatim.
    Provider(serde_json::Value),
    /// The provider answered with something that is neither tokens nor an error.
    InvalidResponse,
    /// The record store refused or failed the write.
    RecordStore(String),
}

impl Error {
    pub(crate) fn request(kind: RequestErrorKind, message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind: DomainErrorKind::Request(kind),
        }
    }

    pub(crate) fn config(kind: ConfigErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config(kind)),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

// This is where we translate errors from the `connect-auth` layer to the `domain` layer.
impl From<ConnectAuthError> for Error {
    fn from(err: ConnectAuthError) -> Self {
        let error_kind = match &err.error_kind {
            ConnectAuthErrorKind::OAuth(OAuthErrorKind::InvalidState) => {
                DomainErrorKind::Request(RequestErrorKind::InvalidState)
            }
            ConnectAuthErrorKind::OAuth(OAuthErrorKind::InvalidEndpoint) => {
                DomainErrorKind::Internal(InternalErrorKind::Config(
                    ConfigErrorKind::InvalidProviderEndpoint,
                ))
            }
            ConnectAuthErrorKind::OAuth(OAuthErrorKind::ProviderRejected(payload)) => {
                DomainErrorKind::External(ExternalErrorKind::Provider(payload.clone()))
            }
            ConnectAuthErrorKind::OAuth(OAuthErrorKind::InvalidResponse) => {
                DomainErrorKind::External(ExternalErrorKind::InvalidResponse)
            }
            ConnectAuthErrorKind::Session(SessionErrorKind::CsrfMismatch) => {
                DomainErrorKind::Request(RequestErrorKind::CsrfMismatch)
            }
            ConnectAuthErrorKind::Session(SessionErrorKind::MissingPkceVerifier) => {
                DomainErrorKind::Request(RequestErrorKind::MissingPkceVerifier)
            }
            ConnectAuthErrorKind::Token(TokenErrorKind::Storage) => {
                let detail = StdError::source(&err)
                    .map(|source| source.to_string())
                    .unwrap_or_else(|| err.to_string());
                DomainErrorKind::External(ExternalErrorKind::RecordStore(detail))
            }
            ConnectAuthErrorKind::Http(HttpErrorKind::BuilderFailed) => {
                DomainErrorKind::Internal(InternalErrorKind::Other(err.to_string()))
            }
            ConnectAuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connect_auth::error::{oauth_error, session_error, storage_error};
    use serde_json::json;

    #[test]
    fn test_session_errors_are_request_errors() {
        let err: Error = session_error(SessionErrorKind::CsrfMismatch, "differs").into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Request(RequestErrorKind::CsrfMismatch)
        );

        let err: Error = session_error(SessionErrorKind::MissingPkceVerifier, "absent").into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Request(RequestErrorKind::MissingPkceVerifier)
        );
    }

    #[test]
    fn test_invalid_state_is_request_error() {
        let err: Error = oauth_error(OAuthErrorKind::InvalidState, "no separator").into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Request(RequestErrorKind::InvalidState)
        );
    }

    #[test]
    fn test_provider_payload_survives_translation() {
        let payload = json!({"error": "invalid_grant", "log_id": "l1"});
        let err: Error = ConnectAuthError {
            source: None,
            error_kind: ConnectAuthErrorKind::OAuth(OAuthErrorKind::ProviderRejected(
                payload.clone(),
            )),
        }
        .into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Provider(payload))
        );
    }

    #[test]
    fn test_storage_error_keeps_detail() {
        let err: Error = storage_error("record store returned 422").into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::RecordStore(
                "record store returned 422".to_string()
            ))
        );
    }

    #[test]
    fn test_network_error_is_external() {
        let err: Error = ConnectAuthError {
            source: None,
            error_kind: ConnectAuthErrorKind::Http(HttpErrorKind::Network),
        }
        .into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Network)
        );
    }
}
