//! Request tracing middleware.
//!
//! Opens one `tracing` span per request and propagates
//! [W3C Trace Context](https://www.w3.org/TR/trace-context/) across the hop:
//!
//! - `traceparent` on the request names the parent span; without it a new
//!   trace is started
//! - `traceparent` on the response carries this request's span
//! - `tracestate` is echoed unchanged
//!
//! ## Span fields
//!
//! | Field              | Value                                  |
//! |--------------------|----------------------------------------|
//! | `service`          | configured service name                |
//! | `http.method`      | request method                         |
//! | `http.target`      | decoded request path                   |
//! | `http.route`       | matched route, recorded on completion  |
//! | `http.status_code` | response status, recorded on completion|
//! | `trace_id`         | 32 hex digits                          |
//! | `span_id`          | 16 hex digits                          |
//! | `parent_span_id`   | upstream span, when propagated         |
//!
//! With `tessera_telemetry::init_tracing` installed the span is exported
//! over OTLP; otherwise it only reaches the log subscriber.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use ::tracing::field::Empty;
use ::tracing::Instrument;
use futures_util::FutureExt;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use tessera_core::{handler_fn, Context, HandleFunc};
use uuid::Uuid;

use crate::middleware::Middleware;

/// The W3C Trace Context header for trace propagation.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// The W3C Trace State header for vendor-specific data.
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Name of the per-request span.
pub const REQUEST_SPAN_NAME: &str = "http_request";

/// Wraps every request in a span and propagates its trace context.
///
/// The [`SpanInfo`] for the request is stored as a context extension so
/// handlers can forward it on outgoing calls.
///
/// # Example
///
/// ```rust
/// use tessera_middleware::stages::Tracing;
///
/// let tracing = Tracing::new("checkout");
/// ```
#[derive(Debug, Clone)]
pub struct Tracing {
    service_name: Arc<str>,
}

impl Tracing {
    /// Creates a tracing stage reporting as `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: Arc::from(service_name.into()),
        }
    }

    /// The service name recorded on every span.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Default for Tracing {
    fn default() -> Self {
        Self::new("tessera")
    }
}

impl Middleware for Tracing {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn wrap(&self, next: HandleFunc) -> HandleFunc {
        let service_name = Arc::clone(&self.service_name);
        handler_fn(move |ctx| {
            let next = Arc::clone(&next);
            let service_name = Arc::clone(&service_name);
            Box::pin(async move {
                let parent = TraceContext::from_headers(ctx.headers());
                let trace_state = ctx.headers().get(TRACESTATE_HEADER).cloned();
                let info = SpanInfo::start(&service_name, parent.as_ref());

                let span = ::tracing::info_span!(
                    target: "tessera::request",
                    REQUEST_SPAN_NAME,
                    service = %service_name,
                    http.method = %ctx.method(),
                    http.target = %ctx.path(),
                    http.route = Empty,
                    http.status_code = Empty,
                    trace_id = %info.trace_id,
                    span_id = %info.span_id,
                    parent_span_id = info.parent_span_id.as_deref(),
                );
                ctx.set_extension(info.clone());

                let outcome = AssertUnwindSafe(next(ctx))
                    .catch_unwind()
                    .instrument(span.clone())
                    .await;

                let status = if outcome.is_ok() {
                    response_status(ctx)
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                if let Some(route) = ctx.matched_route() {
                    span.record("http.route", route);
                }
                span.record("http.status_code", status.as_u16());

                inject(ctx.writer_mut().headers_mut(), &info, trace_state);

                if let Err(payload) = outcome {
                    std::panic::resume_unwind(payload);
                }
            })
        })
    }
}

/// The status the client will see: a committed one wins over the buffer.
fn response_status(ctx: &Context) -> StatusCode {
    ctx.writer()
        .status()
        .or_else(|| ctx.resp_status())
        .unwrap_or(StatusCode::OK)
}

fn inject(headers: &mut HeaderMap, info: &SpanInfo, trace_state: Option<HeaderValue>) {
    match HeaderValue::from_str(&info.traceparent()) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(TRACEPARENT_HEADER), value);
        }
        Err(err) => ::tracing::warn!(error = %err, "failed to encode traceparent"),
    }
    if let Some(state) = trace_state {
        headers.insert(HeaderName::from_static(TRACESTATE_HEADER), state);
    }
}

/// Parsed `traceparent` from an upstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// The 128-bit trace ID as lowercase hex.
    pub trace_id: String,
    /// The upstream span ID as lowercase hex.
    pub parent_span_id: String,
    /// Trace flags (sampling, etc.).
    pub flags: TraceFlags,
}

impl TraceContext {
    /// Parses a `traceparent` header value.
    ///
    /// Format: `{version}-{trace-id}-{parent-span-id}-{flags}`, e.g.
    /// `00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`. Only
    /// version `00` is accepted, and all-zero IDs are invalid.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let (version, trace_id, parent_span_id, flags) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || version != "00" {
            return None;
        }
        if !is_hex_id(trace_id, 32) || !is_hex_id(parent_span_id, 16) {
            return None;
        }
        if flags.len() != 2 {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id: trace_id.to_ascii_lowercase(),
            parent_span_id: parent_span_id.to_ascii_lowercase(),
            flags: TraceFlags(flags),
        })
    }

    /// Reads and parses the `traceparent` header.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(TRACEPARENT_HEADER)?.to_str().ok()?;
        Self::parse(value)
    }
}

fn is_hex_id(id: &str, len: usize) -> bool {
    id.len() == len && id.bytes().all(|b| b.is_ascii_hexdigit()) && id.bytes().any(|b| b != b'0')
}

/// Trace flags from the W3C Trace Context spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// No flags set.
    pub const NONE: Self = Self(0x00);
    /// The trace is sampled.
    pub const SAMPLED: Self = Self(0x01);

    /// Returns true if the sampled flag is set.
    #[must_use]
    pub const fn is_sampled(self) -> bool {
        self.0 & 0x01 != 0
    }

    /// The raw flag byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Identity of the span opened for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanInfo {
    /// The service name.
    pub service_name: String,
    /// The trace this request belongs to.
    pub trace_id: String,
    /// This request's span.
    pub span_id: String,
    /// The upstream span, if one was propagated.
    pub parent_span_id: Option<String>,
    /// Flags inherited from upstream, or sampled for a new trace.
    pub flags: TraceFlags,
}

impl SpanInfo {
    /// Starts a span under `parent`, or a new trace without one.
    #[must_use]
    pub fn start(service_name: &str, parent: Option<&TraceContext>) -> Self {
        let (trace_id, parent_span_id, flags) = match parent {
            Some(p) => (p.trace_id.clone(), Some(p.parent_span_id.clone()), p.flags),
            None => (generate_trace_id(), None, TraceFlags::SAMPLED),
        };
        Self {
            service_name: service_name.to_string(),
            trace_id,
            span_id: generate_span_id(),
            parent_span_id,
            flags,
        }
    }

    /// The `traceparent` value naming this span as the parent.
    #[must_use]
    pub fn traceparent(&self) -> String {
        format!("00-{}-{}-{:02x}", self.trace_id, self.span_id, self.flags.bits())
    }
}

fn generate_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn generate_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}
