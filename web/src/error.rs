use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use domain::error::{
    ConfigErrorKind, DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
    RequestErrorKind,
};

use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

fn error_body(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn upstream_error_body(code: &str, detail: String) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": code, "detail": detail })),
    )
        .into_response()
}

// Every error leaves as a JSON body with an `error` code. Provider rejections
// are the exception: their payload is echoed verbatim.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            DomainErrorKind::Request(request_error_kind) => {
                let code = match request_error_kind {
                    RequestErrorKind::InvalidRequest => "invalid_request",
                    RequestErrorKind::MissingCodeOrState => "missing_code_or_state",
                    RequestErrorKind::InvalidState => "invalid_state",
                    RequestErrorKind::CsrfMismatch => "csrf_mismatch",
                    RequestErrorKind::MissingPkceVerifier => "missing_pkce_verifier",
                };
                debug!("Rejecting request: {code}");
                error_body(StatusCode::BAD_REQUEST, code)
            }
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Config(config_error_kind) => {
                    let code = match config_error_kind {
                        ConfigErrorKind::MissingBaseUrl => "missing_base_url",
                        ConfigErrorKind::MissingClientCredentials => "missing_client_credentials",
                        ConfigErrorKind::MissingRecordStore => "missing_record_store_config",
                        ConfigErrorKind::InvalidProviderEndpoint => "invalid_provider_endpoint",
                    };
                    error!("Configuration error: {code}");
                    error_body(StatusCode::INTERNAL_SERVER_ERROR, code)
                }
                InternalErrorKind::Other(message) => {
                    error!("Internal error: {message}");
                    error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Provider(payload) => {
                    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
                }
                ExternalErrorKind::Network => {
                    let detail = self
                        .0
                        .source
                        .as_ref()
                        .map(|source| source.to_string())
                        .unwrap_or_else(|| "network error".to_string());
                    upstream_error_body("upstream_unavailable", detail)
                }
                ExternalErrorKind::InvalidResponse => upstream_error_body(
                    "invalid_provider_response",
                    "token endpoint returned an unexpected body".to_string(),
                ),
                ExternalErrorKind::RecordStore(detail) => {
                    upstream_error_body("record_store_failed", detail)
                }
            },
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
