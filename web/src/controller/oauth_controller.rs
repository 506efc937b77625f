//! Controller for the TikTok account linking flow.
//!
//! Both endpoints are reached through browser redirects, so neither takes
//! custom headers. Session continuity travels in the `tt_csrf` and `tt_pkce`
//! cookies and the OAuth `state` parameter.

use crate::extractors::cookie_session::CookieSession;
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;

use domain::creator_connection;
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for starting OAuth
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OAuthStart {
    /// Creator to link the TikTok account to.
    pub creator_key: Option<String>,
}

/// Query parameters for OAuth callback
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OAuthCallback {
    /// Authorization code issued by TikTok.
    pub code: Option<String>,
    /// `{creator_key}|{csrf_token}` as sent at start.
    pub state: Option<String>,
}

/// GET /api/oauth/start
///
/// Binds a CSRF token and PKCE verifier to the user agent and redirects to
/// TikTok's authorization endpoint.
#[utoipa::path(
    get,
    path = "/api/oauth/start",
    params(OAuthStart),
    responses(
        (status = 307, description = "Redirect to TikTok authorization; sets tt_csrf and tt_pkce"),
        (status = 400, description = "invalid_request: missing creator_key or OAuth not configured"),
    )
)]
pub async fn start(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<OAuthStart>,
) -> Result<(CookieJar, Redirect), Error> {
    let mut session = CookieSession::new(jar);

    let url = creator_connection::start_authorization(
        &app_state.config,
        params.creator_key.as_deref(),
        &mut session,
    )?;

    Ok((session.into_jar(), Redirect::temporary(&url)))
}

/// GET /api/oauth/callback
///
/// Handles TikTok's redirect after the creator grants access: validates the
/// state against the session cookies, exchanges the code and stores the
/// tokens. The session cookies are expired on every response once read.
#[utoipa::path(
    get,
    path = "/api/oauth/callback",
    params(OAuthCallback),
    responses(
        (status = 307, description = "Redirect to the dashboard with connected=1"),
        (status = 400, description = "missing_code_or_state, invalid_state, csrf_mismatch, missing_pkce_verifier, or TikTok's error payload"),
        (status = 500, description = "missing_base_url or other missing configuration"),
        (status = 502, description = "TikTok or the record store could not be reached or failed"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<OAuthCallback>,
) -> Result<(CookieJar, Redirect), (CookieJar, Error)> {
    let mut session = CookieSession::new(jar);

    let verified = creator_connection::verify_callback(
        &app_state.config,
        params.code.as_deref(),
        params.state.as_deref(),
        &mut session,
    );
    let jar = session.into_jar();

    let verified = match verified {
        Ok(verified) => verified,
        Err(e) => return Err((jar, e.into())),
    };

    match creator_connection::complete_authorization(&app_state.config, verified).await {
        Ok(dashboard_url) => Ok((jar, Redirect::temporary(&dashboard_url))),
        Err(e) => Err((jar, e.into())),
    }
}
