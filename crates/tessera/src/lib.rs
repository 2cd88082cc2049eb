//! # Tessera
//!
//! **Trie-routed async HTTP framework with onion middleware**
//!
//! - **Trie router** – static, `:param` and `*` segments with fixed
//!   precedence and boot-time conflict detection
//! - **Onion middleware** – each middleware wraps the rest of the chain;
//!   the buffered response is flushed exactly once
//! - **Sessions** – pluggable store and propagator, in-memory and Redis
//!   stores and a cookie propagator included
//! - **Templates** – MiniJinja behind a small engine trait
//! - **Observability** – `tracing` logs, per-request spans with W3C trace
//!   context and OTLP export, and Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tessera::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ServerError> {
//!     let mut builder = Server::builder();
//!     builder
//!         .get("/user/:id", handler_fn(|ctx| Box::pin(async move {
//!             let id = ctx.path_value("id").unwrap_or_default();
//!             ctx.set_resp_data(format!("user {id}"));
//!         })))?
//!         .use_middleware(Recovery::new())
//!         .use_middleware(AccessLog::new());
//!
//!     builder.build().run().await
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! Request → flush → middleware[0] → … → dispatcher → handler
//!                                                      ↓
//! Response ← flush ← middleware[0] ← … ←───────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/tessera/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use tessera_core as core;

// Re-export router types
pub use tessera_router as router;

// Re-export middleware types
pub use tessera_middleware as middleware;

// Re-export session types
pub use tessera_session as session;

// Re-export template engine
pub use tessera_template as template;

// Re-export telemetry setup
pub use tessera_telemetry as telemetry;

// Re-export server types
pub use tessera_server as server;

/// Prelude module for convenient imports.
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    pub use tessera_core::{
        handler_fn, BoxFuture, Context, ContextError, HandleFunc, ResponseWriter, TemplateEngine,
        TemplateError,
    };

    pub use tessera_middleware::stages::{AccessLog, ErrorPages, Metrics, Recovery, Tracing};
    pub use tessera_middleware::{FnMiddleware, Middleware};

    pub use tessera_router::RouteError;

    pub use tessera_session::cookie::CookiePropagator;
    pub use tessera_session::memory::MemoryStore;
    pub use tessera_session::{Manager, Session, SessionError};

    pub use tessera_template::JinjaEngine;

    pub use tessera_telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};

    pub use tessera_server::files::{FileDownloader, FileUploader, StaticResourceHandler};
    pub use tessera_server::{
        ConfigLoader, Server, ServerBuilder, ServerConfig, ServerError, ShutdownSignal,
    };
}
