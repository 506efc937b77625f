use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use domain::{SessionScope, SessionStore};

/// Session values carried in short-lived cookies on the user agent.
///
/// Every cookie is `HttpOnly`, `SameSite=Lax` and scoped to `/`. Changes are
/// collected in the wrapped jar and only reach the user agent once the jar is
/// returned as part of the response.
pub(crate) struct CookieSession {
    jar: CookieJar,
}

impl CookieSession {
    pub(crate) fn new(jar: CookieJar) -> Self {
        Self { jar }
    }

    pub(crate) fn into_jar(self) -> CookieJar {
        self.jar
    }

    fn write(&mut self, name: &'static str, value: String, scope: SessionScope) {
        let max_age = time::Duration::seconds(scope.max_age.as_secs() as i64);
        let cookie = Cookie::build((name, value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .secure(scope.secure);

        self.jar = self.jar.clone().add(cookie);
    }
}

impl SessionStore for CookieSession {
    fn set(&mut self, name: &'static str, value: String, scope: SessionScope) {
        self.write(name, value, scope);
    }

    fn get(&self, name: &str) -> Option<String> {
        self.jar
            .get(name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    fn clear(&mut self, name: &'static str, secure: bool) {
        self.write(name, String::new(), SessionScope::expire(secure));
    }
}
