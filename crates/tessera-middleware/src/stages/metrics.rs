//! Request metrics middleware.
//!
//! Records, per request:
//!
//! - `{prefix}_duration_seconds` - latency histogram
//! - `{prefix}_requests_total` - request counter
//!
//! Both carry the labels `pattern` (the matched route, `unknown` when
//! nothing matched), `method` and `status`, plus any constant labels. The
//! values go to whatever `metrics` recorder is installed; see
//! `tessera_telemetry::metrics::init_metrics` for the Prometheus exporter.

use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;
use metrics::Label;
use tessera_core::{handler_fn, Context, HandleFunc};

use crate::middleware::Middleware;

/// Route label used when no route matched.
const UNKNOWN_ROUTE: &str = "unknown";

/// Records latency and request counts per route.
#[derive(Debug, Clone)]
pub struct Metrics {
    duration_name: String,
    total_name: String,
    const_labels: Vec<Label>,
}

impl Metrics {
    /// Creates a metrics stage with the default `http_request` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> MetricsBuilder {
        MetricsBuilder {
            name: "http_request".to_string(),
            subsystem: None,
            const_labels: Vec::new(),
        }
    }

    /// Name of the latency histogram.
    #[must_use]
    pub fn duration_name(&self) -> &str {
        &self.duration_name
    }

    /// Name of the request counter.
    #[must_use]
    pub fn total_name(&self) -> &str {
        &self.total_name
    }

    fn record(&self, ctx: &Context, started: Instant) {
        let status = ctx
            .resp_status()
            .or_else(|| ctx.writer().status())
            .unwrap_or(StatusCode::OK);
        let route = ctx
            .matched_route()
            .filter(|r| !r.is_empty())
            .unwrap_or(UNKNOWN_ROUTE);

        let mut labels = self.const_labels.clone();
        labels.push(Label::new("pattern", route.to_string()));
        labels.push(Label::new("method", ctx.method().to_string()));
        labels.push(Label::new("status", status.as_u16().to_string()));

        metrics::histogram!(self.duration_name.clone(), labels.clone())
            .record(started.elapsed().as_secs_f64());
        metrics::counter!(self.total_name.clone(), labels).increment(1);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for Metrics {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn wrap(&self, next: HandleFunc) -> HandleFunc {
        let this = Arc::new(self.clone());
        handler_fn(move |ctx| {
            let next = Arc::clone(&next);
            let this = Arc::clone(&this);
            Box::pin(async move {
                let started = Instant::now();
                next(ctx).await;
                this.record(ctx, started);
            })
        })
    }
}

/// Builder for [`Metrics`].
#[derive(Debug)]
pub struct MetricsBuilder {
    name: String,
    subsystem: Option<String>,
    const_labels: Vec<Label>,
}

impl MetricsBuilder {
    /// Sets the metric name prefix.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Prepends `subsystem_` to the metric names.
    #[must_use]
    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    /// Adds a label attached to every sample.
    #[must_use]
    pub fn const_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.const_labels.push(Label::new(key.into(), value.into()));
        self
    }

    /// Builds the middleware.
    #[must_use]
    pub fn build(self) -> Metrics {
        let prefix = match self.subsystem {
            Some(subsystem) => format!("{subsystem}_{}", self.name),
            None => self.name,
        };
        Metrics {
            duration_name: format!("{prefix}_duration_seconds"),
            total_name: format!("{prefix}_requests_total"),
            const_labels: self.const_labels,
        }
    }
}
