use std::time::Duration;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "fabl_session";

/// Attributes written alongside the session cookie.
#[derive(Clone, Debug)]
pub struct CookieOptions {
    pub name: String,
    pub domain: Option<String>,
    pub max_age: Option<Duration>,
    pub secure: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            domain: None,
            max_age: None,
            secure: true,
        }
    }
}

impl CookieOptions {
    /// Render a `Set-Cookie` header value carrying `value`.
    pub fn set_cookie(&self, value: &str) -> String {
        let mut out = format!("{}={}; Path=/; HttpOnly", self.name, value);
        if self.secure {
            out.push_str("; Secure");
        }
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }
        out
    }
}

/// Find the value of cookie `name` across all `Cookie` headers.
pub fn find_cookie<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"'))
}
