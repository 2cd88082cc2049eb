//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber: an [`EnvFilter`] plus either a JSON
//! `fmt` layer (production) or a pretty one (development). Given an
//! OpenTelemetry tracer, spans are also bridged into it for OTLP export.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! tracing::info!(route = "/user/:id", "Request handled");
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use opentelemetry_sdk::trace::Tracer;
use serde::Deserialize;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive, e.g. `"info"` or `"tessera=debug,hyper=warn"`.
    ///
    /// `RUST_LOG` takes precedence when set.
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span events (new, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Human-readable output at `debug`.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Returns [`TelemetryError::AlreadyInitialized`] on a second successful call.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    init_logging_with_tracer(config, None)
}

/// Like [`init_logging`], also exporting spans through `tracer`.
///
/// The OpenTelemetry layer uses the same filter directives as the log
/// output.
pub fn init_logging_with_tracer(config: &LogConfig, tracer: Option<Tracer>) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let directives = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => directives,
        _ => config.level.clone(),
    };
    let filter = create_env_filter(&directives)?;
    let otel_filter = create_env_filter(&directives)?;

    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TelemetryError::AlreadyInitialized("logging"));
    }

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);
        let otel_layer = tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t).with_filter(otel_filter));
        tracing_subscriber::registry().with(fmt_layer).with(otel_layer).try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);
        let otel_layer = tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t).with_filter(otel_filter));
        tracing_subscriber::registry().with(fmt_layer).with(otel_layer).try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses a filter string such as `"info"` or `"tessera_server=debug,warn"`.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level {filter:?}: {e}")))
}
