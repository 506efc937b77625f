//! Linking a creator to their TikTok account.
//!
//! The handshake has two halves that share no server-side state:
//!
//! 1. [`start_authorization`] binds a fresh CSRF token and PKCE verifier to
//!    the user agent's session and returns the TikTok consent URL.
//! 2. [`verify_callback`] checks what TikTok sent back against the session,
//!    then [`complete_authorization`] exchanges the code and stores the tokens.
//!
//! The session values are single use: the callback clears them as soon as it
//! has read them, whatever the outcome.

use crate::error::{ConfigErrorKind, Error, RequestErrorKind};
use crate::gateway::airtable::AirtableCreatorStore;
use crate::gateway::oauth::{
    tiktok, PkceVerifier, StateParameter, Storage, TokenExchangeClient,
};
use chrono::Utc;
use connect_auth::error::{session_error, SessionErrorKind};
use connect_auth::random::{OsRandom, RandomSource};
use connect_auth::session::{SessionScope, SessionStore, CSRF_KEY, PKCE_KEY};
use log::*;
use service::config::Config;
use url::Url;

const CALLBACK_PATH: &str = "/api/oauth/callback";

/// The public base URL with trailing slashes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    url: String,
    secure: bool,
}

impl BaseUrl {
    /// Returns `None` unless `raw` is an absolute http(s) URL with a host.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
            return None;
        }

        Some(Self {
            url: trimmed.to_string(),
            secure: parsed.scheme() == "https",
        })
    }

    fn from_config(config: &Config) -> Option<Self> {
        config.public_base_url().as_deref().and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Whether session cookies must carry the `Secure` attribute.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// The callback URI registered with TikTok. Sent verbatim on both legs.
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.url, CALLBACK_PATH)
    }

    pub fn dashboard_url(&self, creator_key: &str) -> String {
        format!(
            "{}/?creator_key={}&connected=1",
            self.url,
            urlencoding::encode(creator_key)
        )
    }
}

/// A callback that passed every local check and is ready for code exchange.
#[derive(Debug)]
pub struct VerifiedCallback {
    pub creator_key: String,
    pub code: String,
    pub pkce_verifier: PkceVerifier,
    pub base_url: BaseUrl,
}

/// Begin linking `creator_key`, returning the URL to send the user agent to.
pub fn start_authorization<S: SessionStore + ?Sized>(
    config: &Config,
    creator_key: Option<&str>,
    session: &mut S,
) -> Result<String, Error> {
    start_authorization_with(config, creator_key, session, &OsRandom)
}

/// Same as [`start_authorization`] with an explicit randomness source.
pub fn start_authorization_with<S, R>(
    config: &Config,
    creator_key: Option<&str>,
    session: &mut S,
    random: &R,
) -> Result<String, Error>
where
    S: SessionStore + ?Sized,
    R: RandomSource + ?Sized,
{
    let creator_key = creator_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| Error::request(RequestErrorKind::InvalidRequest, "Missing creator_key"))?;

    let client_key = config.tiktok_client_key().ok_or_else(|| {
        warn!("Refusing to start authorization: TIKTOK_CLIENT_KEY is not configured");
        Error::request(RequestErrorKind::InvalidRequest, "Missing TikTok client key")
    })?;

    let base_url = BaseUrl::from_config(config).ok_or_else(|| {
        warn!("Refusing to start authorization: PUBLIC_BASE_URL is missing or malformed");
        Error::request(RequestErrorKind::InvalidRequest, "Missing public base URL")
    })?;

    let request = tiktok::new_authorize_endpoint(config, client_key).authorization_request(
        creator_key,
        &base_url.redirect_uri(),
        random,
    )?;

    let scope = SessionScope::issue(base_url.is_secure());
    session.set(CSRF_KEY, request.csrf_token().as_str().to_string(), scope);
    session.set(PKCE_KEY, request.pkce_verifier.as_str().to_string(), scope);

    info!("Redirecting creator {} to TikTok authorization", creator_key);
    Ok(request.url)
}

/// Validate TikTok's redirect against the session bound at start.
///
/// Checks run in order and the first failure wins: code and state present,
/// state well formed, CSRF token matches, PKCE verifier present, base URL
/// configured. Once the state parses the session values are cleared, so every
/// later outcome, success included, leaves them expired.
pub fn verify_callback<S: SessionStore + ?Sized>(
    config: &Config,
    code: Option<&str>,
    state: Option<&str>,
    session: &mut S,
) -> Result<VerifiedCallback, Error> {
    let (code, state) = match (non_empty(code), non_empty(state)) {
        (Some(code), Some(state)) => (code, state),
        _ => {
            return Err(Error::request(
                RequestErrorKind::MissingCodeOrState,
                "Callback is missing code or state",
            ))
        }
    };

    let state = StateParameter::parse(state)
        .inspect_err(|_| warn!("Rejecting callback with malformed state"))?;

    let base_url = BaseUrl::from_config(config);
    let bound_csrf = session.get(CSRF_KEY);
    let bound_verifier = session.get(PKCE_KEY);

    let secure = base_url.as_ref().is_some_and(BaseUrl::is_secure);
    session.clear(CSRF_KEY, secure);
    session.clear(PKCE_KEY, secure);

    state
        .csrf_token()
        .verify(bound_csrf.as_deref())
        .inspect_err(|_| {
            warn!(
                "CSRF mismatch on callback for creator {}",
                state.creator_key()
            )
        })?;

    let pkce_verifier = bound_verifier.map(PkceVerifier::from_string).ok_or_else(|| {
        warn!(
            "No PKCE verifier bound for creator {}",
            state.creator_key()
        );
        session_error(
            SessionErrorKind::MissingPkceVerifier,
            "No PKCE verifier bound to the session",
        )
    })?;

    let base_url = base_url.ok_or_else(|| {
        error!("PUBLIC_BASE_URL is missing or malformed");
        Error::config(ConfigErrorKind::MissingBaseUrl)
    })?;

    Ok(VerifiedCallback {
        creator_key: state.creator_key().to_string(),
        code: code.to_string(),
        pkce_verifier,
        base_url,
    })
}

/// Exchange the code with TikTok and store the tokens in Airtable.
///
/// Returns the dashboard URL to redirect to.
pub async fn complete_authorization(
    config: &Config,
    verified: VerifiedCallback,
) -> Result<String, Error> {
    let provider = tiktok::new_provider(config)?;
    let store = AirtableCreatorStore::from_config(config)?;

    exchange_and_persist(verified, &provider, &store).await
}

/// Exchange the code through `client` and hand the tokens to `persister`.
///
/// Nothing is persisted when the exchange fails. A persistence failure after a
/// successful exchange is returned as is; the tokens are not revoked.
pub async fn exchange_and_persist<C, P>(
    verified: VerifiedCallback,
    client: &C,
    persister: &P,
) -> Result<String, Error>
where
    C: TokenExchangeClient + ?Sized,
    P: Storage + ?Sized,
{
    let VerifiedCallback {
        creator_key,
        code,
        pkce_verifier,
        base_url,
    } = verified;

    let grant = client
        .exchange(&code, &base_url.redirect_uri(), &pkce_verifier)
        .await
        .inspect_err(|e| warn!("Code exchange failed for creator {creator_key}: {e:?}"))?;

    if let Some(log_id) = grant.log_id.as_deref() {
        debug!("TikTok token exchange log_id {log_id}");
    }

    let tokens = grant.into_bundle(Utc::now())?;
    persister
        .upsert(&creator_key, tokens)
        .await
        .inspect_err(|e| {
            error!("Tokens for creator {creator_key} were issued but could not be stored: {e:?}")
        })?;

    info!("Creator {creator_key} connected their TikTok account");
    Ok(base_url.dashboard_url(&creator_key))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, ExternalErrorKind, InternalErrorKind};
    use crate::gateway::oauth::{TokenBundle, TokenGrant};
    use async_trait::async_trait;
    use clap::Parser;
    use connect_auth::error::{
        storage_error, Error as ConnectAuthError, ErrorKind, OAuthErrorKind,
    };
    use secrecy::ExposeSecret;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct MemorySession {
        values: HashMap<&'static str, (String, SessionScope)>,
    }

    impl MemorySession {
        fn bound(csrf: &str, verifier: &str) -> Self {
            let mut session = Self::default();
            session.set(CSRF_KEY, csrf.to_string(), SessionScope::issue(true));
            session.set(PKCE_KEY, verifier.to_string(), SessionScope::issue(true));
            session
        }

        fn scope(&self, name: &str) -> Option<SessionScope> {
            self.values.get(name).map(|(_, scope)| *scope)
        }

        fn assert_expired(&self) {
            for name in [CSRF_KEY, PKCE_KEY] {
                assert_eq!(self.get(name), None, "{name} should be empty");
                assert_eq!(
                    self.scope(name).map(|s| s.max_age),
                    Some(Duration::ZERO),
                    "{name} should be expired"
                );
            }
        }
    }

    impl SessionStore for MemorySession {
        fn set(&mut self, name: &'static str, value: String, scope: SessionScope) {
            self.values.insert(name, (value, scope));
        }

        fn get(&self, name: &str) -> Option<String> {
            self.values
                .get(name)
                .map(|(value, _)| value.clone())
                .filter(|value| !value.is_empty())
        }

        fn clear(&mut self, name: &'static str, secure: bool) {
            self.values
                .insert(name, (String::new(), SessionScope::expire(secure)));
        }
    }

    struct FixedRandom(u8);

    impl RandomSource for FixedRandom {
        fn fill_bytes(&self, dest: &mut [u8]) {
            dest.fill(self.0);
        }
    }

    struct MockExchange {
        response: serde_json::Value,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl MockExchange {
        fn answering(response: serde_json::Value) -> Self {
            Self {
                response,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TokenExchangeClient for MockExchange {
        async fn exchange(
            &self,
            code: &str,
            redirect_uri: &str,
            verifier: &PkceVerifier,
        ) -> Result<TokenGrant, ConnectAuthError> {
            self.calls.lock().unwrap().push((
                code.to_string(),
                redirect_uri.to_string(),
                verifier.as_str().to_string(),
            ));

            if self.response.get("error").is_some() {
                return Err(ConnectAuthError {
                    source: None,
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::ProviderRejected(
                        self.response.clone(),
                    )),
                });
            }
            Ok(serde_json::from_value(self.response.clone()).unwrap())
        }
    }

    #[derive(Default)]
    struct MockStore {
        fail: bool,
        writes: Mutex<Vec<(String, TokenBundle)>>,
    }

    #[async_trait]
    impl Storage for MockStore {
        async fn upsert(
            &self,
            creator_key: &str,
            tokens: TokenBundle,
        ) -> Result<(), ConnectAuthError> {
            if self.fail {
                return Err(storage_error("Airtable write failed: 503 unavailable"));
            }
            self.writes
                .lock()
                .unwrap()
                .push((creator_key.to_string(), tokens));
            Ok(())
        }
    }

    fn config(base_url: Option<&str>) -> Config {
        let mut args = vec![
            "creator_connect",
            "--tiktok-client-key",
            "ck_test",
            "--tiktok-client-secret",
            "cs_test",
        ];
        if let Some(base_url) = base_url {
            args.extend(["--public-base-url", base_url]);
        }
        Config::parse_from(args)
    }

    fn token_response() -> serde_json::Value {
        json!({
            "access_token": "tok",
            "expires_in": 3600,
            "open_id": "oid",
            "refresh_token": "rtok",
            "refresh_expires_in": 31536000,
            "scope": "s",
            "token_type": "Bearer"
        })
    }

    fn verified(creator_key: &str) -> VerifiedCallback {
        VerifiedCallback {
            creator_key: creator_key.to_string(),
            code: "the-code".to_string(),
            pkce_verifier: PkceVerifier::from_string("verifier-123".to_string()),
            base_url: BaseUrl::parse("https://connect.example.com").unwrap(),
        }
    }

    fn query(url: &str) -> HashMap<String, String> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    fn request_kind(err: Error) -> RequestErrorKind {
        match err.error_kind {
            DomainErrorKind::Request(kind) => kind,
            other => panic!("expected a request error, got {other:?}"),
        }
    }

    #[test]
    fn test_base_url_normalisation() {
        let base = BaseUrl::parse("https://connect.example.com///").unwrap();
        assert_eq!(base.as_str(), "https://connect.example.com");
        assert!(base.is_secure());
        assert_eq!(
            base.redirect_uri(),
            "https://connect.example.com/api/oauth/callback"
        );

        assert!(!BaseUrl::parse("http://localhost:4000").unwrap().is_secure());
        assert_eq!(BaseUrl::parse("connect.example.com"), None);
        assert_eq!(BaseUrl::parse("ftp://connect.example.com"), None);
        assert_eq!(BaseUrl::parse(""), None);
    }

    #[test]
    fn test_dashboard_url_encodes_creator_key() {
        let base = BaseUrl::parse("https://connect.example.com/").unwrap();
        assert_eq!(
            base.dashboard_url("toulouse"),
            "https://connect.example.com/?creator_key=toulouse&connected=1"
        );
        assert_eq!(
            base.dashboard_url("a b&c"),
            "https://connect.example.com/?creator_key=a%20b%26c&connected=1"
        );
    }

    #[test]
    fn test_start_authorization_binds_session() {
        let config = config(Some("https://connect.example.com/"));
        let mut session = MemorySession::default();

        let url =
            start_authorization_with(&config, Some("toulouse"), &mut session, &FixedRandom(7))
                .unwrap();

        let params = query(&url);
        assert_eq!(params["client_key"], "ck_test");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(
            params["redirect_uri"],
            "https://connect.example.com/api/oauth/callback"
        );

        let csrf = session.get(CSRF_KEY).unwrap();
        assert_eq!(csrf, "07".repeat(16));
        assert_eq!(params["state"], format!("toulouse|{csrf}"));

        let verifier = PkceVerifier::from_string(session.get(PKCE_KEY).unwrap());
        assert_eq!(verifier.as_str().len(), 86);
        assert_eq!(params["code_challenge"], verifier.challenge().as_str());

        for name in [CSRF_KEY, PKCE_KEY] {
            assert_eq!(session.scope(name), Some(SessionScope::issue(true)));
        }
    }

    #[test]
    fn test_start_authorization_plain_http_is_not_secure() {
        let config = config(Some("http://localhost:4000"));
        let mut session = MemorySession::default();

        start_authorization(&config, Some("toulouse"), &mut session).unwrap();

        assert_eq!(session.scope(CSRF_KEY), Some(SessionScope::issue(false)));
    }

    #[test]
    fn test_start_authorization_state_splits_back() {
        let config = config(Some("https://connect.example.com"));
        let mut session = MemorySession::default();

        let url = start_authorization(&config, Some("paris-15"), &mut session).unwrap();
        let state = StateParameter::parse(&query(&url)["state"]).unwrap();

        assert_eq!(state.creator_key(), "paris-15");
        assert_eq!(state.csrf_token().as_str().len(), 32);
        assert!(state
            .csrf_token()
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_start_authorization_rejects_missing_inputs() {
        let mut session = MemorySession::default();

        for creator_key in [None, Some(""), Some("   ")] {
            let err = start_authorization(
                &config(Some("https://connect.example.com")),
                creator_key,
                &mut session,
            )
            .unwrap_err();
            assert_eq!(request_kind(err), RequestErrorKind::InvalidRequest);
        }

        let err = start_authorization(&config(None), Some("toulouse"), &mut session).unwrap_err();
        assert_eq!(request_kind(err), RequestErrorKind::InvalidRequest);

        let no_client_key = Config::parse_from([
            "creator_connect",
            "--public-base-url",
            "https://connect.example.com",
        ]);
        let err = start_authorization(&no_client_key, Some("toulouse"), &mut session).unwrap_err();
        assert_eq!(request_kind(err), RequestErrorKind::InvalidRequest);

        assert!(session.values.is_empty());
    }

    #[test]
    fn test_verify_callback_accepts_matching_session() {
        let config = config(Some("https://connect.example.com/"));
        let mut session = MemorySession::bound("c0ffee", "verifier-123");

        let verified = verify_callback(
            &config,
            Some("the-code"),
            Some("toulouse|c0ffee"),
            &mut session,
        )
        .unwrap();

        assert_eq!(verified.creator_key, "toulouse");
        assert_eq!(verified.code, "the-code");
        assert_eq!(verified.pkce_verifier.as_str(), "verifier-123");
        assert_eq!(verified.base_url.as_str(), "https://connect.example.com");
        session.assert_expired();
        assert_eq!(session.scope(CSRF_KEY).map(|s| s.secure), Some(true));
    }

    #[test]
    fn test_verify_callback_missing_code_or_state() {
        let config = config(Some("https://connect.example.com"));

        for (code, state) in [
            (None, Some("toulouse|c0ffee")),
            (Some("the-code"), None),
            (Some(""), Some("toulouse|c0ffee")),
            (Some("the-code"), Some("")),
        ] {
            let mut session = MemorySession::bound("c0ffee", "verifier-123");
            let err = verify_callback(&config, code, state, &mut session).unwrap_err();
            assert_eq!(request_kind(err), RequestErrorKind::MissingCodeOrState);
            assert_eq!(session.get(CSRF_KEY).as_deref(), Some("c0ffee"));
        }
    }

    #[test]
    fn test_verify_callback_invalid_state() {
        let config = config(Some("https://connect.example.com"));

        for state in ["abc", "|xyz", "abc|"] {
            let mut session = MemorySession::bound("c0ffee", "verifier-123");
            let err =
                verify_callback(&config, Some("the-code"), Some(state), &mut session).unwrap_err();
            assert_eq!(request_kind(err), RequestErrorKind::InvalidState);
        }
    }

    #[test]
    fn test_verify_callback_csrf_mismatch_expires_session() {
        let config = config(Some("https://connect.example.com"));

        let mut session = MemorySession::bound("c0ffee", "verifier-123");
        let err = verify_callback(
            &config,
            Some("the-code"),
            Some("toulouse|deadbeef"),
            &mut session,
        )
        .unwrap_err();
        assert_eq!(request_kind(err), RequestErrorKind::CsrfMismatch);
        session.assert_expired();

        let mut empty = MemorySession::default();
        let err = verify_callback(
            &config,
            Some("the-code"),
            Some("toulouse|deadbeef"),
            &mut empty,
        )
        .unwrap_err();
        assert_eq!(request_kind(err), RequestErrorKind::CsrfMismatch);
        empty.assert_expired();
    }

    #[test]
    fn test_verify_callback_missing_pkce_verifier() {
        let config = config(Some("https://connect.example.com"));
        let mut session = MemorySession::default();
        session.set(CSRF_KEY, "c0ffee".to_string(), SessionScope::issue(true));

        let err = verify_callback(
            &config,
            Some("the-code"),
            Some("toulouse|c0ffee"),
            &mut session,
        )
        .unwrap_err();

        assert_eq!(request_kind(err), RequestErrorKind::MissingPkceVerifier);
        session.assert_expired();
    }

    #[test]
    fn test_verify_callback_missing_base_url() {
        let config = config(None);
        let mut session = MemorySession::bound("c0ffee", "verifier-123");

        let err = verify_callback(
            &config,
            Some("the-code"),
            Some("toulouse|c0ffee"),
            &mut session,
        )
        .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config(ConfigErrorKind::MissingBaseUrl))
        );
        session.assert_expired();
        assert_eq!(session.scope(PKCE_KEY).map(|s| s.secure), Some(false));
    }

    #[tokio::test]
    async fn test_exchange_and_persist_connects_creator() {
        let client = MockExchange::answering(token_response());
        let store = MockStore::default();

        let before = Utc::now();
        let redirect = exchange_and_persist(verified("toulouse"), &client, &store)
            .await
            .unwrap();
        let after = Utc::now();

        assert_eq!(
            redirect,
            "https://connect.example.com/?creator_key=toulouse&connected=1"
        );

        let calls = client.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            [(
                "the-code".to_string(),
                "https://connect.example.com/api/oauth/callback".to_string(),
                "verifier-123".to_string()
            )]
        );

        let writes = store.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let (creator_key, tokens) = &writes[0];
        assert_eq!(creator_key, "toulouse");
        assert_eq!(tokens.access_token.expose_secret(), "tok");
        assert_eq!(tokens.open_id, "oid");
        assert!(tokens.expires_at >= before + chrono::Duration::seconds(3600));
        assert!(tokens.expires_at <= after + chrono::Duration::seconds(3600));
        assert!(tokens.refresh_expires_at >= before + chrono::Duration::seconds(31536000));
    }

    #[tokio::test]
    async fn test_exchange_and_persist_provider_error_skips_store() {
        let payload = json!({
            "error": "invalid_grant",
            "error_description": "Authorization code is expired.",
            "log_id": "log-2"
        });
        let client = MockExchange::answering(payload.clone());
        let store = MockStore::default();

        let err = exchange_and_persist(verified("toulouse"), &client, &store)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Provider(payload))
        );
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_and_persist_surfaces_store_failure() {
        let client = MockExchange::answering(token_response());
        let store = MockStore {
            fail: true,
            ..Default::default()
        };

        let err = exchange_and_persist(verified("toulouse"), &client, &store)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::RecordStore(
                "Airtable write failed: 503 unavailable".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_exchange_and_persist_rejects_out_of_range_lifetime() {
        let mut response = token_response();
        response["expires_in"] = json!(i64::MAX);
        let client = MockExchange::answering(response);
        let store = MockStore::default();

        let err = exchange_and_persist(verified("toulouse"), &client, &store)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::InvalidResponse)
        );
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_authorization_requires_record_store() {
        let config = config(Some("https://connect.example.com"));

        let err = complete_authorization(&config, verified("toulouse"))
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config(
                ConfigErrorKind::MissingRecordStore
            ))
        );
    }
}
