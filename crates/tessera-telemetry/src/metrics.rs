//! Prometheus metrics setup.
//!
//! The `Metrics` middleware records through the `metrics` facade; this
//! module installs the recorder those macros report to.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `{prefix}_requests_total` | Counter | `pattern`, `method`, `status` | Total requests |
//! | `{prefix}_duration_seconds` | Histogram | `pattern`, `method`, `status` | Request latency |
//!
//! `prefix` defaults to `http_request`.

use std::net::SocketAddr;
use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose `/metrics` on (e.g. `"0.0.0.0:9090"`).
    ///
    /// `None` installs the recorder without a listener; scrape through
    /// [`render_metrics`] instead.
    pub addr: Option<String>,

    /// Metric name prefix, matching the middleware's configured name.
    pub prefix: String,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: Some("0.0.0.0:9090".to_string()),
            prefix: "http_request".to_string(),
            // 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the global Prometheus recorder.
///
/// When `addr` is set the HTTP exporter is spawned onto the current Tokio
/// runtime, so this must then be called from inside one.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr = config
        .addr
        .as_deref()
        .map(|addr| {
            addr.parse::<SocketAddr>()
                .map_err(|e| TelemetryError::InvalidAddress(format!("{addr}: {e}")))
        })
        .transpose()?;

    if METRICS_HANDLE.get().is_some() {
        return Err(TelemetryError::AlreadyInitialized("metrics"));
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = match addr {
        Some(addr) => {
            let (recorder, exporter) = builder
                .with_http_listener(addr)
                .build()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|_| TelemetryError::AlreadyInitialized("metrics"))?;
            tokio::spawn(async move {
                if let Err(e) = exporter.await {
                    error!(error = ?e, "Metrics exporter stopped");
                }
            });
            handle
        }
        None => builder
            .install_recorder()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?,
    };

    let _ = METRICS_HANDLE.set(handle);
    describe_request_metrics(&config.prefix);

    match addr {
        Some(addr) => info!(%addr, "Prometheus exporter listening"),
        None => info!("Prometheus recorder installed"),
    }
    Ok(())
}

/// Returns the global metrics handle if initialized.
pub fn metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for the request metrics under `prefix`.
pub fn describe_request_metrics(prefix: &str) {
    describe_counter!(
        format!("{prefix}_requests_total"),
        "Total number of HTTP requests processed"
    );
    describe_histogram!(
        format!("{prefix}_duration_seconds"),
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
}
