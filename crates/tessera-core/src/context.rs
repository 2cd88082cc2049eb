//! Per-request context.
//!
//! A [`Context`] is created for every request, threaded through the
//! middleware chain and the handler, and dropped after the response is
//! flushed. Only one task touches it at a time, so it needs no locking.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tessera_router::Params;
use uuid::Uuid;

use crate::error::ContextError;
use crate::response::ResponseWriter;
use crate::template::{TemplateEngine, TemplateError};

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, so IDs sort by arrival in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request state shared by middleware and the handler.
///
/// The buffered response (`resp_status`, `resp_data`) is what the flush step
/// writes to the [`ResponseWriter`] once the chain has finished. Writing to
/// the writer directly bypasses the buffer, and later middleware can no
/// longer change what the client receives.
///
/// # Scratch space
///
/// Two stores are available for collaborators:
///
/// - [`Context::set_extension`] keys values by type, for state owned by one
///   component (e.g. a tracing span)
/// - [`Context::set_user_value`] keys values by string; each collaborator
///   owns its keys (the session manager uses its configured key)
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use tessera_core::Context;
///
/// let request = http::Request::builder()
///     .uri("/user?name=tom")
///     .body(Bytes::new())
///     .unwrap();
/// let ctx = Context::new(request);
///
/// assert_eq!(ctx.path(), "/user");
/// assert_eq!(ctx.query_value("name").unwrap(), "tom");
/// assert!(ctx.query_value("age").is_err());
/// ```
pub struct Context {
    request_id: RequestId,
    request: Request<Bytes>,
    writer: ResponseWriter,

    resp_status: Option<StatusCode>,
    resp_data: Bytes,
    flushed: bool,

    path_params: Params,
    matched_route: Option<String>,

    decoded_path: Option<String>,
    query_cache: OnceLock<Result<Vec<(String, String)>, String>>,
    template_engine: Option<Arc<dyn TemplateEngine>>,

    user_values: HashMap<String, Box<dyn Any + Send + Sync>>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,

    started_at: Instant,
}

impl Context {
    /// Creates a context for `request` with an open response writer.
    #[must_use]
    pub fn new(request: Request<Bytes>) -> Self {
        Self::with_writer(request, ResponseWriter::new())
    }

    /// Creates a context that writes to `writer`.
    #[must_use]
    pub fn with_writer(request: Request<Bytes>, writer: ResponseWriter) -> Self {
        let decoded_path = decode_component(request.uri().path()).map(Cow::into_owned);
        Self {
            request_id: RequestId::new(),
            request,
            writer,
            resp_status: None,
            resp_data: Bytes::new(),
            flushed: false,
            path_params: Params::new(),
            matched_route: None,
            decoded_path,
            query_cache: OnceLock::new(),
            template_engine: None,
            user_values: HashMap::new(),
            extensions: HashMap::new(),
            started_at: Instant::now(),
        }
    }

    /// Installs the template engine used by [`Context::render`].
    #[must_use]
    pub fn with_template_engine(mut self, engine: Option<Arc<dyn TemplateEngine>>) -> Self {
        self.template_engine = engine;
        self
    }

    // ------------------------------------------------------------------
    // Request
    // ------------------------------------------------------------------

    /// The request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The incoming request.
    #[must_use]
    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// The percent-decoded request path, without the query string.
    ///
    /// Falls back to [`Context::raw_path`] when the path does not decode to
    /// UTF-8.
    #[must_use]
    pub fn path(&self) -> &str {
        self.decoded_path.as_deref().unwrap_or_else(|| self.raw_path())
    }

    /// The request path as it appeared on the wire.
    #[must_use]
    pub fn raw_path(&self) -> &str {
        self.request.uri().path()
    }

    /// The path the router matches against.
    ///
    /// `None` when the path holds a malformed escape or decodes to invalid
    /// UTF-8; such a request matches no route.
    #[must_use]
    pub fn routing_path(&self) -> Option<&str> {
        self.decoded_path.as_deref()
    }

    /// The request host, from the URI authority or the `Host` header.
    #[must_use]
    pub fn host(&self) -> &str {
        self.request
            .uri()
            .authority()
            .map(http::uri::Authority::as_str)
            .or_else(|| self.request.headers().get(HOST).and_then(|h| h.to_str().ok()))
            .unwrap_or("")
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// The request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Deserializes the JSON request body.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, ContextError> {
        let body = self.request.body();
        if body.is_empty() {
            return Err(ContextError::EmptyBody);
        }
        serde_json::from_slice(body).map_err(ContextError::Decode)
    }

    /// Returns the first query parameter named `key`.
    ///
    /// The query string is parsed once per request. A malformed query
    /// string fails every lookup with [`ContextError::Query`].
    pub fn query_value(&self, key: &str) -> Result<String, ContextError> {
        self.query_pairs()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| ContextError::KeyNotFound(key.to_string()))
    }

    /// Returns the form value named `key`.
    ///
    /// URL-encoded body fields take precedence over query parameters, which
    /// are consulted when the body does not carry the key.
    pub fn form_value(&self, key: &str) -> Result<String, ContextError> {
        if self.is_form_body() {
            let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(self.request.body())?;
            if let Some((_, v)) = fields.into_iter().find(|(k, _)| k == key) {
                return Ok(v);
            }
        }
        self.query_value(key)
    }

    /// Returns the path parameter named `key`.
    pub fn path_value(&self, key: &str) -> Result<String, ContextError> {
        self.path_params
            .get(key)
            .map(str::to_string)
            .ok_or_else(|| ContextError::KeyNotFound(key.to_string()))
    }

    fn query_pairs(&self) -> Result<&[(String, String)], ContextError> {
        let parsed = self.query_cache.get_or_init(|| {
            let query = self.request.uri().query().unwrap_or("");
            parse_query(query).map_err(|err| {
                tracing::warn!(request_id = %self.request_id, query, error = %err, "malformed query string");
                err
            })
        });
        match parsed {
            Ok(pairs) => Ok(pairs),
            Err(err) => Err(ContextError::Query(err.clone())),
        }
    }

    fn is_form_body(&self) -> bool {
        matches!(*self.method(), Method::POST | Method::PUT | Method::PATCH)
            && self
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
    }

    // ------------------------------------------------------------------
    // Routing results
    // ------------------------------------------------------------------

    /// Path parameters bound by the router.
    #[must_use]
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Sets the path parameters.
    pub fn set_path_params(&mut self, params: Params) {
        self.path_params = params;
    }

    /// The pattern of the matched route, if routing succeeded.
    #[must_use]
    pub fn matched_route(&self) -> Option<&str> {
        self.matched_route.as_deref()
    }

    /// Sets the matched route pattern.
    pub fn set_matched_route(&mut self, route: impl Into<String>) {
        self.matched_route = Some(route.into());
    }

    // ------------------------------------------------------------------
    // Buffered response
    // ------------------------------------------------------------------

    /// The buffered status code.
    #[must_use]
    pub const fn resp_status(&self) -> Option<StatusCode> {
        self.resp_status
    }

    /// Sets the buffered status code.
    pub fn set_resp_status(&mut self, status: StatusCode) {
        self.resp_status = Some(status);
    }

    /// The buffered body.
    #[must_use]
    pub fn resp_data(&self) -> &[u8] {
        &self.resp_data
    }

    /// Replaces the buffered body.
    pub fn set_resp_data(&mut self, data: impl Into<Bytes>) {
        self.resp_data = data.into();
    }

    /// Buffers `value` as a JSON response with `status`.
    pub fn resp_json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> Result<(), ContextError> {
        let data = serde_json::to_vec(value).map_err(ContextError::Encode)?;
        self.writer
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.resp_status = Some(status);
        self.resp_data = data.into();
        Ok(())
    }

    /// Buffers `value` as a `200 OK` JSON response.
    pub fn resp_ok<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ContextError> {
        self.resp_json(StatusCode::OK, value)
    }

    /// Renders template `name` into the buffered body.
    ///
    /// Sets `200 OK` on success and `500 Internal Server Error` on failure;
    /// the error is returned so the handler can log or replace the body.
    pub fn render<T: Serialize + ?Sized>(&mut self, name: &str, data: &T) -> Result<(), TemplateError> {
        match self.try_render(name, data) {
            Ok(bytes) => {
                self.resp_status = Some(StatusCode::OK);
                self.resp_data = bytes.into();
                Ok(())
            }
            Err(err) => {
                self.resp_status = Some(StatusCode::INTERNAL_SERVER_ERROR);
                Err(err)
            }
        }
    }

    fn try_render<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<Vec<u8>, TemplateError> {
        let engine = self.template_engine.as_ref().ok_or(TemplateError::NoEngine)?;
        let value = serde_json::to_value(data)?;
        engine.render(name, &value)
    }

    // ------------------------------------------------------------------
    // Response sink
    // ------------------------------------------------------------------

    /// The raw response sink.
    #[must_use]
    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    /// Mutable access to the raw response sink.
    ///
    /// Bytes written here go straight to the client; middleware running
    /// after the handler cannot alter them.
    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Consumes the context, returning the response sink.
    #[must_use]
    pub fn into_writer(self) -> ResponseWriter {
        self.writer
    }

    /// Returns true once [`Context::flush`] has run.
    #[must_use]
    pub const fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Writes the buffered status and body to the sink.
    ///
    /// Runs at most once per context. A failed write is logged and the
    /// buffered fields are left as they were.
    pub fn flush(&mut self) {
        if self.flushed {
            return;
        }
        self.flushed = true;

        if let Some(status) = self.resp_status {
            self.writer.write_header(status);
        }
        if let Err(err) = self.writer.write(&self.resp_data) {
            tracing::error!(
                request_id = %self.request_id,
                path = %self.path(),
                error = %err,
                "failed to flush response"
            );
        }
    }

    // ------------------------------------------------------------------
    // Scratch space
    // ------------------------------------------------------------------

    /// Stores a value under a string key.
    pub fn set_user_value<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.user_values.insert(key.into(), Box::new(value));
    }

    /// Returns the value stored under `key` if it has type `T`.
    #[must_use]
    pub fn user_value<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.user_values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes the value stored under `key`.
    pub fn remove_user_value(&mut self, key: &str) -> bool {
        self.user_values.remove(key).is_some()
    }

    /// Stores a typed extension, replacing any previous value of that type.
    pub fn set_extension<T: Any + Send + Sync>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns the extension of type `T`.
    #[must_use]
    pub fn get_extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns the extension of type `T`.
    pub fn remove_extension<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Returns true if an extension of type `T` is present.
    #[must_use]
    pub fn has_extension<T: Any + Send + Sync>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Request::default())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("method", self.method())
            .field("path", &self.path())
            .field("resp_status", &self.resp_status)
            .field("resp_len", &self.resp_data.len())
            .field("matched_route", &self.matched_route)
            .field("path_params", &self.path_params)
            .field("flushed", &self.flushed)
            .finish_non_exhaustive()
    }
}

/// Decodes `%XX` escapes in `input`.
///
/// Returns `None` when a `%` is not followed by two hex digits or the
/// decoded bytes are not UTF-8.
fn decode_component(input: &str) -> Option<Cow<'_, str>> {
    let bytes = input.as_bytes();
    let escapes_ok = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'%')
        .all(|(i, _)| bytes.get(i + 1..i + 3).is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)));
    if !escapes_ok {
        return None;
    }
    percent_decode_str(input).decode_utf8().ok()
}

/// Parses an `application/x-www-form-urlencoded` query string.
fn parse_query(query: &str) -> Result<Vec<(String, String)>, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| -> Result<(String, String), String> {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let decode = |part: &str| {
                decode_component(&part.replace('+', " "))
                    .map(Cow::into_owned)
                    .ok_or_else(|| format!("invalid escape in {pair:?}"))
            };
            Ok((decode(key)?, decode(value)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriteError;
    use serde::Deserialize;

    fn request(method: Method, uri: &str, content_type: Option<&str>, body: &'static str) -> Request<Bytes> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Bytes::from_static(body.as_bytes())).unwrap()
    }

    struct Upper;

    impl TemplateEngine for Upper {
        fn render(&self, name: &str, data: &serde_json::Value) -> Result<Vec<u8>, TemplateError> {
            match name {
                "greet" => Ok(format!("HELLO {}", data["name"].as_str().unwrap_or("")).into_bytes()),
                other => Err(TemplateError::NotFound(other.to_string())),
            }
        }
    }

    #[test]
    fn test_query_value() {
        let ctx = Context::new(request(Method::GET, "/s?q=rust&q=go&page=2", None, ""));
        assert_eq!(ctx.query_value("q").unwrap(), "rust");
        assert_eq!(ctx.query_value("page").unwrap(), "2");
        assert!(ctx.query_value("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_query_value_without_query_string() {
        let ctx = Context::new(request(Method::GET, "/s", None, ""));
        assert!(matches!(ctx.query_value("q"), Err(ContextError::KeyNotFound(k)) if k == "q"));
    }

    #[test]
    fn test_query_value_decodes_escapes() {
        let ctx = Context::new(request(Method::GET, "/s?q=hello+world&tag=caf%C3%A9&empty=&flag", None, ""));
        assert_eq!(ctx.query_value("q").unwrap(), "hello world");
        assert_eq!(ctx.query_value("tag").unwrap(), "café");
        assert_eq!(ctx.query_value("empty").unwrap(), "");
        assert_eq!(ctx.query_value("flag").unwrap(), "");
    }

    #[test]
    fn test_malformed_query_reaches_caller() {
        let ctx = Context::new(request(Method::GET, "/s?name=%FF&page=2", None, ""));
        let err = ctx.query_value("page").unwrap_err();
        assert!(matches!(err, ContextError::Query(_)));
        assert!(!err.is_not_found());

        let ctx = Context::new(request(Method::GET, "/s?q=%zz", None, ""));
        assert!(matches!(ctx.query_value("q"), Err(ContextError::Query(_))));
        assert!(matches!(ctx.form_value("q"), Err(ContextError::Query(_))));
    }

    #[test]
    fn test_path_is_decoded() {
        let ctx = Context::new(request(Method::GET, "/param/hello%20world?x=1", None, ""));
        assert_eq!(ctx.path(), "/param/hello world");
        assert_eq!(ctx.routing_path(), Some("/param/hello world"));
        assert_eq!(ctx.raw_path(), "/param/hello%20world");
    }

    #[test]
    fn test_undecodable_path_has_no_routing_path() {
        for uri in ["/bad%zz", "/bad%FF", "/trailing%2"] {
            let ctx = Context::new(request(Method::GET, uri, None, ""));
            assert_eq!(ctx.routing_path(), None, "{uri}");
            assert_eq!(ctx.path(), uri);
        }
    }

    #[test]
    fn test_form_value_prefers_body() {
        let ctx = Context::new(request(
            Method::POST,
            "/login?name=query&next=%2Fhome",
            Some("application/x-www-form-urlencoded"),
            "name=body&pass=secret",
        ));
        assert_eq!(ctx.form_value("name").unwrap(), "body");
        assert_eq!(ctx.form_value("pass").unwrap(), "secret");
        assert_eq!(ctx.form_value("next").unwrap(), "/home");
        assert!(ctx.form_value("other").is_err());
    }

    #[test]
    fn test_form_value_ignores_non_form_body() {
        let ctx = Context::new(request(Method::POST, "/x", Some("application/json"), "name=body"));
        assert!(ctx.form_value("name").is_err());
    }

    #[test]
    fn test_path_value() {
        let mut ctx = Context::default();
        let mut params = Params::new();
        params.push("id", "42");
        ctx.set_path_params(params);

        assert_eq!(ctx.path_value("id").unwrap(), "42");
        assert!(ctx.path_value("name").is_err());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
    }

    #[test]
    fn test_bind_json() {
        let ctx = Context::new(request(Method::POST, "/u", None, r#"{"name":"tom"}"#));
        let user: User = ctx.bind_json().unwrap();
        assert_eq!(user, User { name: "tom".to_string() });
    }

    #[test]
    fn test_bind_json_errors() {
        let ctx = Context::new(request(Method::POST, "/u", None, ""));
        assert!(matches!(ctx.bind_json::<User>(), Err(ContextError::EmptyBody)));

        let ctx = Context::new(request(Method::POST, "/u", None, "{"));
        assert!(matches!(ctx.bind_json::<User>(), Err(ContextError::Decode(_))));
    }

    #[test]
    fn test_resp_json_is_buffered() {
        let mut ctx = Context::default();
        ctx.resp_json(StatusCode::CREATED, &serde_json::json!({"id": 1})).unwrap();

        assert_eq!(ctx.resp_status(), Some(StatusCode::CREATED));
        assert_eq!(ctx.resp_data(), br#"{"id":1}"#);
        assert!(ctx.writer().body().is_empty());
        assert_eq!(ctx.writer().headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_render() {
        let engine: Arc<dyn TemplateEngine> = Arc::new(Upper);
        let mut ctx = Context::default().with_template_engine(Some(engine));

        ctx.render("greet", &serde_json::json!({"name": "tom"})).unwrap();
        assert_eq!(ctx.resp_status(), Some(StatusCode::OK));
        assert_eq!(ctx.resp_data(), b"HELLO tom");

        assert!(ctx.render("missing", &()).is_err());
        assert_eq!(ctx.resp_status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_render_without_engine() {
        let mut ctx = Context::default();
        assert!(matches!(ctx.render("x", &()), Err(TemplateError::NoEngine)));
        assert_eq!(ctx.resp_status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_flush_writes_once() {
        let mut ctx = Context::default();
        ctx.set_resp_status(StatusCode::NOT_FOUND);
        ctx.set_resp_data("NOT FOUND");

        ctx.flush();
        ctx.set_resp_data("changed");
        ctx.flush();

        assert!(ctx.is_flushed());
        assert_eq!(ctx.writer().status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(ctx.writer().body(), b"NOT FOUND");
    }

    #[test]
    fn test_flush_after_direct_write_keeps_sink_status() {
        let mut ctx = Context::default();
        ctx.writer_mut().write_header(StatusCode::BAD_REQUEST);
        ctx.set_resp_status(StatusCode::OK);
        ctx.flush();

        assert_eq!(ctx.writer().status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_flush_to_closed_sink_keeps_buffer() {
        let mut ctx = Context::with_writer(Request::default(), ResponseWriter::closed());
        ctx.set_resp_data("lost");
        ctx.flush();

        assert!(ctx.is_flushed());
        assert_eq!(ctx.resp_data(), b"lost");
        assert_eq!(ctx.writer_mut().write(b"x"), Err(WriteError::Closed));
    }

    #[test]
    fn test_user_values() {
        let mut ctx = Context::default();
        ctx.set_user_value("session", String::from("abc"));

        assert_eq!(ctx.user_value::<String>("session").map(String::as_str), Some("abc"));
        assert!(ctx.user_value::<u32>("session").is_none());
        assert!(ctx.remove_user_value("session"));
        assert!(!ctx.remove_user_value("session"));
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Tenant(&'static str);

        let mut ctx = Context::default();
        assert!(!ctx.has_extension::<Tenant>());

        ctx.set_extension(Tenant("acme"));
        assert_eq!(ctx.get_extension::<Tenant>(), Some(&Tenant("acme")));
        assert_eq!(ctx.remove_extension::<Tenant>(), Some(Tenant("acme")));
        assert!(ctx.get_extension::<Tenant>().is_none());
    }

    #[test]
    fn test_host_from_header() {
        let req = Request::builder()
            .uri("/")
            .header(HOST, "example.com:8080")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(Context::new(req).host(), "example.com:8080");
    }
}
