//! # Tessera Middleware
//!
//! Middleware composition and request dispatch for Tessera.
//!
//! Every request runs through one composed chain:
//!
//! ```text
//! flush ─▶ middleware[0] ─▶ … ─▶ middleware[n-1] ─▶ dispatcher ─▶ handler
//!   ▲                                                                 │
//!   └──────────── post-logic runs in reverse order ◀──────────────────┘
//! ```
//!
//! - [`Middleware`] turns "the next step" into "a new step"
//! - [`Pipeline`] folds registered middleware around a terminal step and
//!   always adds the flush step outermost
//! - [`dispatcher`] is the terminal step: route lookup, parameter binding,
//!   handler call, or `404 NOT FOUND`
//! - [`stages`] holds the optional built-in middleware
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use http::Method;
//! use tessera_core::handler_fn;
//! use tessera_middleware::{dispatcher, stages::Recovery, HandlerRouter, Pipeline};
//!
//! let mut router = HandlerRouter::new();
//! router
//!     .add_route(Method::GET, "/", handler_fn(|ctx| Box::pin(async move { ctx.set_resp_data("home") })))
//!     .unwrap();
//!
//! let pipeline = Pipeline::builder()
//!     .with(Recovery::new())
//!     .build(dispatcher(Arc::new(router)));
//! assert_eq!(pipeline.stage_names(), vec!["recovery"]);
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatch;
mod middleware;
mod pipeline;
pub mod stages;

pub use dispatch::{dispatcher, HandlerRouter, NOT_FOUND_BODY};
pub use middleware::{FnMiddleware, Middleware};
pub use pipeline::{compose, BoxedMiddleware, Pipeline, PipelineBuilder};
