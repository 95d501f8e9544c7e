//! Cookie store access shared by every client that needs the CSRF token

use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use url::Url;

/// Cookie holding the anti-forgery token
pub const CSRF_COOKIE: &str = "csrf_token";

/// Header the token is mirrored into
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Read/write handle over a shared cookie jar, scoped to the API origin.
///
/// Values are never cached: every `get` re-reads the jar so rotations made
/// by any request (via `Set-Cookie`) are visible to all holders.
#[derive(Clone)]
pub struct CookieAccess {
    jar: Arc<Jar>,
    origin: Url,
}

impl CookieAccess {
    /// Create an empty store scoped to `origin`
    pub fn new(origin: Url) -> Self {
        Self::with_jar(Arc::new(Jar::default()), origin)
    }

    /// Wrap an existing jar
    pub fn with_jar(jar: Arc<Jar>, origin: Url) -> Self {
        Self { jar, origin }
    }

    /// The underlying jar, for wiring into a `reqwest::Client`
    pub fn jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    /// Origin the cookies are looked up for
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Current value of cookie `name`, if present
    pub fn get(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.origin)?;
        let raw = header.to_str().ok()?;
        raw.split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, value)| *key == name && !value.is_empty())
            .map(|(_, value)| value.to_string())
    }

    /// Store a `Set-Cookie` style string for the origin
    pub fn set(&self, cookie: &str) {
        self.jar.add_cookie_str(cookie, &self.origin);
    }

    /// Current CSRF token, if the server has issued one
    pub fn csrf_token(&self) -> Option<String> {
        self.get(CSRF_COOKIE)
    }
}

impl std::fmt::Debug for CookieAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieAccess")
            .field("origin", &self.origin.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CookieAccess {
        CookieAccess::new(Url::parse("http://localhost:8000/api").unwrap())
    }

    #[test]
    fn test_missing_cookie() {
        assert_eq!(store().csrf_token(), None);
    }

    #[test]
    fn test_reads_named_cookie_among_others() {
        let cookies = store();
        cookies.set("session=abc; Path=/");
        cookies.set("csrf_token=tok123; Path=/");
        assert_eq!(cookies.csrf_token().as_deref(), Some("tok123"));
        assert_eq!(cookies.get("session").as_deref(), Some("abc"));
        assert_eq!(cookies.get("csrf"), None);
    }

    #[test]
    fn test_rotation_visible_to_clones() {
        let cookies = store();
        let other = cookies.clone();
        cookies.set("csrf_token=first; Path=/");
        assert_eq!(other.csrf_token().as_deref(), Some("first"));
        other.set("csrf_token=second; Path=/");
        assert_eq!(cookies.csrf_token().as_deref(), Some("second"));
    }
}
