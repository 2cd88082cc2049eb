//! Panic recovery middleware.
//!
//! The pipeline does not catch panics on its own. Registering [`Recovery`]
//! catches a panic from every step inside it, buffers an error response and
//! lets the outer stages and the flush step finish normally.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use http::StatusCode;
use tessera_core::{handler_fn, Context, HandleFunc};

use super::panic_message;
use crate::middleware::Middleware;

type LogFn = Arc<dyn Fn(&Context, &str) + Send + Sync>;

/// Converts panics into a buffered error response.
///
/// # Example
///
/// ```rust
/// use http::StatusCode;
/// use tessera_middleware::stages::Recovery;
///
/// let recovery = Recovery::new()
///     .status(StatusCode::SERVICE_UNAVAILABLE)
///     .body("try again later");
/// ```
#[derive(Clone)]
pub struct Recovery {
    status: StatusCode,
    body: Bytes,
    log_fn: Option<LogFn>,
}

impl Recovery {
    /// Creates a recovery stage answering `500 Internal Server Error`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Bytes::from_static(b"Internal Server Error"),
            log_fn: None,
        }
    }

    /// Sets the status buffered after a panic.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets the body buffered after a panic.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Replaces the default `tracing` log with `f`.
    #[must_use]
    pub fn log_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, &str) + Send + Sync + 'static,
    {
        self.log_fn = Some(Arc::new(f));
        self
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery")
            .field("status", &self.status)
            .field("body", &self.body)
            .field("custom_log", &self.log_fn.is_some())
            .finish()
    }
}

impl Middleware for Recovery {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn wrap(&self, next: HandleFunc) -> HandleFunc {
        let config = self.clone();
        handler_fn(move |ctx| {
            let next = Arc::clone(&next);
            let config = config.clone();
            Box::pin(async move {
                let Err(payload) = AssertUnwindSafe(next(ctx)).catch_unwind().await else {
                    return;
                };

                let message = panic_message(&*payload);
                ctx.set_resp_status(config.status);
                ctx.set_resp_data(config.body.clone());
                match &config.log_fn {
                    Some(log) => log(ctx, &message),
                    None => tracing::error!(
                        request_id = %ctx.request_id(),
                        method = %ctx.method(),
                        path = %ctx.path(),
                        panic = %message,
                        "recovered from panic"
                    ),
                }
            })
        })
    }
}
