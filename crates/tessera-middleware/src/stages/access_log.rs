//! Access logging middleware.
//!
//! One JSON line per request, written after the rest of the chain has run.
//! The line is also written when an inner step panics; the panic then keeps
//! unwinding.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use tessera_core::{handler_fn, Context, HandleFunc};

use crate::middleware::Middleware;

type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// One access-log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessLogEntry {
    /// Request host.
    pub host: String,
    /// Matched route pattern, empty when nothing matched.
    pub route: String,
    /// HTTP method.
    pub http_method: String,
    /// Request path.
    pub path: String,
}

impl AccessLogEntry {
    /// Builds the entry for `ctx`.
    #[must_use]
    pub fn from_context(ctx: &Context) -> Self {
        Self {
            host: ctx.host().to_string(),
            route: ctx.matched_route().unwrap_or_default().to_string(),
            http_method: ctx.method().to_string(),
            path: ctx.path().to_string(),
        }
    }
}

/// Emits an [`AccessLogEntry`] as JSON for every request.
///
/// By default lines go to `tracing` at `INFO` under the `tessera::access`
/// target.
///
/// # Example
///
/// ```rust
/// use tessera_middleware::stages::AccessLog;
///
/// let access_log = AccessLog::new().log_fn(|line| println!("{line}"));
/// ```
#[derive(Clone)]
pub struct AccessLog {
    log_fn: LogFn,
}

impl AccessLog {
    /// Creates an access log writing to `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_fn: Arc::new(|line: &str| tracing::info!(target: "tessera::access", "{line}")),
        }
    }

    /// Sends each line to `f` instead.
    #[must_use]
    pub fn log_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log_fn = Arc::new(f);
        self
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLog").finish_non_exhaustive()
    }
}

impl Middleware for AccessLog {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn wrap(&self, next: HandleFunc) -> HandleFunc {
        let log_fn = Arc::clone(&self.log_fn);
        handler_fn(move |ctx| {
            let next = Arc::clone(&next);
            let log_fn = Arc::clone(&log_fn);
            Box::pin(async move {
                let outcome = AssertUnwindSafe(next(ctx)).catch_unwind().await;

                match serde_json::to_string(&AccessLogEntry::from_context(ctx)) {
                    Ok(line) => log_fn(&line),
                    Err(err) => tracing::warn!(error = %err, "failed to encode access log"),
                }

                if let Err(payload) = outcome {
                    std::panic::resume_unwind(payload);
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::dispatcher;
    use crate::pipeline::Pipeline;
    use bytes::Bytes;
    use http::{Method, Request};
    use parking_lot::Mutex;
    use tessera_router::Router;

    fn capture() -> (AccessLog, Arc<Mutex<Vec<String>>>) {
        let lines: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&lines);
        (AccessLog::new().log_fn(move |l| sink.lock().push(l.to_string())), lines)
    }

    #[tokio::test]
    async fn test_logs_matched_route() {
        let mut router = Router::new();
        router
            .add_route(
                Method::GET,
                "/user/:id",
                handler_fn(|ctx| Box::pin(async move { ctx.set_resp_data("u") })),
            )
            .unwrap();

        let (access_log, lines) = capture();
        let pipeline = Pipeline::builder()
            .with(access_log)
            .build(dispatcher(Arc::new(router)));

        let request = Request::builder()
            .uri("http://localhost:8080/user/7")
            .body(Bytes::new())
            .unwrap();
        let mut ctx = Context::new(request);
        pipeline.run(&mut ctx).await;

        let lines = lines.lock();
        assert_eq!(lines.len(), 1);
        let entry: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(entry["host"], "localhost:8080");
        assert_eq!(entry["route"], "/user/:id");
        assert_eq!(entry["http_method"], "GET");
        assert_eq!(entry["path"], "/user/7");
    }

    #[tokio::test]
    async fn test_logs_even_when_inner_step_panics() {
        let (access_log, lines) = capture();
        let pipeline = Arc::new(
            Pipeline::builder()
                .with(access_log)
                .build(handler_fn(|_ctx| Box::pin(async move { panic!("inner") }))),
        );

        let task = tokio::spawn(async move {
            let mut ctx = Context::default();
            pipeline.run(&mut ctx).await;
        });

        assert!(task.await.unwrap_err().is_panic());
        assert_eq!(lines.lock().len(), 1);
    }
}
