//! `Set-Cookie` rendering for the session cookie.

use axum::http::{header::InvalidHeaderValue, HeaderValue};
use url::Url;

/// Name of the cookie carrying the encrypted identity.
pub const AUTH_COOKIE: &str = "Rexsl-Auth";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieSettings {
    path: String,
    secure: bool,
}

impl CookieSettings {
    /// Scope the cookie to the path of the public base URL; mark it secure
    /// only when pages are served over HTTPS.
    ///
    /// `;` is percent-encoded so the path can not smuggle in extra attributes.
    #[must_use]
    pub fn from_base_url(base_url: &Url) -> Self {
        let path = base_url.path().trim_end_matches('/');
        let path = if path.is_empty() { "/" } else { path };
        Self {
            path: path.replace(';', "%3B"),
            secure: base_url.scheme() == "https",
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Temporary cookie (no `Max-Age`), dropped by the browser with the session.
    ///
    /// # Errors
    /// Returns an error if `value` is not a valid header value.
    pub fn session(&self, value: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.render(&format!("{AUTH_COOKIE}={value}")))
    }

    /// Already-expired cookie with the same name and path.
    ///
    /// # Errors
    /// Returns an error if the configured path is not a valid header value.
    pub fn expired(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.render(&format!(
            "{AUTH_COOKIE}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
        )))
    }

    fn render(&self, head: &str) -> String {
        let mut cookie = format!("{head}; Path={}; HttpOnly; SameSite=Lax", self.path);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            secure: false,
        }
    }
}
