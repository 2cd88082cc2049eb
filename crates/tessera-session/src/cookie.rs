//! Cookie-based session id propagation.

use std::time::Duration;

use bytes::Bytes;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderValue, Request};
use tessera_core::ResponseWriter;

use crate::{Propagator, SessionError};

/// Default cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "sessId";

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// Only sent with same-site requests.
    Strict,
    /// Sent with same-site requests and top-level navigations.
    Lax,
    /// Sent with all requests. Requires `Secure`.
    None,
}

impl SameSite {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Carries the session id in a cookie.
///
/// `inject` emits `Set-Cookie: <name>=<id>` with the configured attributes,
/// `extract` reads the named cookie from the `Cookie` header, and `remove`
/// overwrites it with `Max-Age=-1`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tessera_session::cookie::CookiePropagator;
///
/// let propagator = CookiePropagator::new()
///     .name("sid")
///     .path("/")
///     .http_only(true)
///     .max_age(Duration::from_secs(1800));
/// assert_eq!(propagator.cookie_name(), "sid");
/// ```
#[derive(Debug, Clone)]
pub struct CookiePropagator {
    name: String,
    path: Option<String>,
    domain: Option<String>,
    max_age: Option<Duration>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl Default for CookiePropagator {
    fn default() -> Self {
        Self::new()
    }
}

impl CookiePropagator {
    /// Creates a propagator using the `sessId` cookie and no attributes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_owned(),
            path: None,
            domain: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Sets the cookie name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the `Path` attribute.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the `Domain` attribute.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the `Max-Age` attribute on injected cookies.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Sets the `Secure` flag.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the `HttpOnly` flag.
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Sets the `SameSite` attribute.
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// The cookie name.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.name
    }

    fn set_cookie(&self, value: &str, max_age: Option<i64>) -> String {
        let mut parts = vec![format!("{}={}", self.name, value)];

        if let Some(ref path) = self.path {
            parts.push(format!("Path={path}"));
        }
        if let Some(ref domain) = self.domain {
            parts.push(format!("Domain={domain}"));
        }
        if let Some(secs) = max_age {
            parts.push(format!("Max-Age={secs}"));
        }
        if self.secure {
            parts.push("Secure".to_owned());
        }
        if self.http_only {
            parts.push("HttpOnly".to_owned());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={}", same_site.as_str()));
        }

        parts.join("; ")
    }

    fn append(writer: &mut ResponseWriter, cookie: &str) -> Result<(), SessionError> {
        let value = HeaderValue::from_str(cookie)
            .map_err(|_| SessionError::InvalidHeader(cookie.to_owned()))?;
        writer.headers_mut().append(SET_COOKIE, value);
        Ok(())
    }
}

/// Finds `name` in one or more `Cookie` header values.
fn find_cookie<'a>(headers: impl Iterator<Item = &'a HeaderValue>, name: &str) -> Option<String> {
    headers
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_owned())
}

impl Propagator for CookiePropagator {
    fn inject(&self, id: &str, writer: &mut ResponseWriter) -> Result<(), SessionError> {
        let max_age = self
            .max_age
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
        Self::append(writer, &self.set_cookie(id, max_age))
    }

    fn extract(&self, request: &Request<Bytes>) -> Result<String, SessionError> {
        find_cookie(request.headers().get_all(COOKIE).iter(), &self.name)
            .ok_or_else(|| SessionError::MissingCookie(self.name.clone()))
    }

    fn remove(&self, writer: &mut ResponseWriter) -> Result<(), SessionError> {
        Self::append(writer, &self.set_cookie("", Some(-1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_cookie(cookie: &str) -> Request<Bytes> {
        Request::builder()
            .uri("/")
            .header(COOKIE, cookie)
            .body(Bytes::new())
            .unwrap()
    }

    fn set_cookies(writer: &ResponseWriter) -> Vec<String> {
        writer
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_owned())
            .collect()
    }

    #[test]
    fn test_inject_default() {
        let mut writer = ResponseWriter::new();
        CookiePropagator::new().inject("abc-123", &mut writer).unwrap();
        assert_eq!(set_cookies(&writer), vec!["sessId=abc-123"]);
    }

    #[test]
    fn test_inject_with_attributes() {
        let propagator = CookiePropagator::new()
            .name("sid")
            .path("/")
            .domain("example.com")
            .max_age(Duration::from_secs(1800))
            .secure(true)
            .http_only(true)
            .same_site(SameSite::Lax);

        let mut writer = ResponseWriter::new();
        propagator.inject("xyz", &mut writer).unwrap();
        assert_eq!(
            set_cookies(&writer),
            vec!["sid=xyz; Path=/; Domain=example.com; Max-Age=1800; Secure; HttpOnly; SameSite=Lax"]
        );
    }

    #[test]
    fn test_inject_rejects_invalid_id() {
        let mut writer = ResponseWriter::new();
        let err = CookiePropagator::new()
            .inject("bad\nid", &mut writer)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidHeader(_)));
        assert!(writer.headers().get(SET_COOKIE).is_none());
    }

    #[test]
    fn test_extract() {
        let propagator = CookiePropagator::new();
        let request = request_with_cookie("theme=dark; sessId=abc-123; lang=en");
        assert_eq!(propagator.extract(&request).unwrap(), "abc-123");
    }

    #[test]
    fn test_extract_quoted_value() {
        let request = request_with_cookie("sessId=\"abc\"");
        assert_eq!(CookiePropagator::new().extract(&request).unwrap(), "abc");
    }

    #[test]
    fn test_extract_across_multiple_headers() {
        let request = Request::builder()
            .header(COOKIE, "theme=dark")
            .header(COOKIE, "sid=42")
            .body(Bytes::new())
            .unwrap();
        let propagator = CookiePropagator::new().name("sid");
        assert_eq!(propagator.extract(&request).unwrap(), "42");
    }

    #[test]
    fn test_extract_missing() {
        let propagator = CookiePropagator::new();
        let request = request_with_cookie("theme=dark");
        assert_eq!(
            propagator.extract(&request),
            Err(SessionError::MissingCookie("sessId".into()))
        );

        let bare = Request::builder().body(Bytes::new()).unwrap();
        assert!(propagator.extract(&bare).is_err());
    }

    #[test]
    fn test_remove_expires_cookie() {
        let propagator = CookiePropagator::new().path("/").max_age(Duration::from_secs(60));
        let mut writer = ResponseWriter::new();
        propagator.remove(&mut writer).unwrap();
        assert_eq!(set_cookies(&writer), vec!["sessId=; Path=/; Max-Age=-1"]);
    }
}
