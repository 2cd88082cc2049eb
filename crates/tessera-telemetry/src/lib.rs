//! Observability setup for Tessera services.
//!
//! - **Logging**: structured JSON or pretty output via `tracing-subscriber`
//! - **Tracing**: OTLP span export via `opentelemetry-otlp`, bridged from
//!   `tracing` spans by `tracing-opentelemetry`
//! - **Metrics**: Prometheus exposition via `metrics-exporter-prometheus`
//!
//! Request-level instrumentation lives in the `AccessLog`, `Tracing` and
//! `Metrics` middleware; this crate only installs the global sinks they
//! report to.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let _guard = init_telemetry(&TelemetryConfig::default()).expect("telemetry");
//!     // serve...
//! }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;
pub mod otel;

use opentelemetry::trace::TracerProvider as _;
use serde::Deserialize;

pub use error::TelemetryError;
pub use logging::{init_logging, init_logging_with_tracer, LogConfig};
pub use metrics::{init_metrics, render_metrics, MetricsConfig};
pub use otel::{init_tracing, shutdown_tracing, TracingConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Combined logging, tracing and metrics configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Logging settings.
    pub logging: LogConfig,
    /// Trace export settings.
    pub tracing: TracingConfig,
    /// Metrics settings.
    pub metrics: MetricsConfig,
}

/// Flushes and shuts down trace export on drop.
///
/// Keep it alive for the lifetime of the service.
#[must_use = "dropping the guard shuts down trace export"]
pub struct TelemetryGuard {
    tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl TelemetryGuard {
    /// Wraps an installed provider, if any.
    pub const fn new(tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>) -> Self {
        Self { tracer_provider }
    }

    /// Returns true if spans are being exported.
    pub const fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }
}

impl std::fmt::Debug for TelemetryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryGuard")
            .field("exporting", &self.is_exporting())
            .finish()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            for result in provider.force_flush() {
                if let Err(e) = result {
                    eprintln!("Error flushing tracer provider: {e}");
                }
            }
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e}");
            }
        }
    }
}

/// Initializes trace export, then logging bridged into it, then metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<TelemetryGuard> {
    let tracer_provider = init_tracing(&config.tracing)?;
    let tracer = tracer_provider.as_ref().map(|p| p.tracer("tessera"));
    init_logging_with_tracer(&config.logging, tracer)?;
    init_metrics(&config.metrics)?;
    Ok(TelemetryGuard::new(tracer_provider))
}
