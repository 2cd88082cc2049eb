//! # Tessera Core
//!
//! Core types shared by every Tessera crate:
//!
//! - [`Context`] - per-request state: request, buffered response, routing
//!   results and scratch space
//! - [`ResponseWriter`] - the raw response sink the buffered response is
//!   flushed to
//! - [`HandleFunc`] - the shared handler type, also the type of every
//!   middleware step
//! - [`TemplateEngine`] - the rendering boundary used by [`Context::render`]

#![doc(html_root_url = "https://docs.rs/tessera-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod handler;
mod response;
mod template;

pub use context::{Context, RequestId};
pub use error::{ContextError, WriteError};
pub use handler::{handler_fn, BoxFuture, HandleFunc};
pub use response::ResponseWriter;
pub use template::{TemplateEngine, TemplateError};

/// Re-exported so handler code can name route parameters without a direct
/// router dependency.
pub use tessera_router::Params;
