//! Built-in middleware stages.
//!
//! | Stage         | Purpose                                              |
//! |---------------|------------------------------------------------------|
//! | [`Recovery`]  | Turn a panic in the rest of the chain into a 500     |
//! | [`ErrorPages`]| Replace the body of responses with selected statuses |
//! | [`AccessLog`] | Emit one JSON access-log line per request            |
//! | [`Metrics`]   | Record latency and request counts per route          |
//! | [`Tracing`]   | Open a span per request and propagate `traceparent`  |
//!
//! None of these are installed by default. Register them in the order you
//! want their pre-logic to run; [`Recovery`] should usually come after the
//! stages that must observe its 500.

mod access_log;
mod error_pages;
mod metrics;
mod recovery;
mod tracing;

pub use access_log::{AccessLog, AccessLogEntry};
pub use error_pages::ErrorPages;
pub use metrics::{Metrics, MetricsBuilder};
pub use recovery::Recovery;
pub use self::tracing::{
    SpanInfo, TraceContext, TraceFlags, Tracing, REQUEST_SPAN_NAME, TRACEPARENT_HEADER,
    TRACESTATE_HEADER,
};

use std::any::Any;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
