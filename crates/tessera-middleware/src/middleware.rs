//! Core middleware trait.
//!
//! A middleware is a transform from "the next step" to "a new step". Both
//! steps are [`HandleFunc`]s, so a middleware decides whether, when and how
//! often the rest of the chain runs.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tessera_core::{handler_fn, HandleFunc};
//! use tessera_middleware::{FnMiddleware, Middleware};
//!
//! let timing = FnMiddleware::new("timing", |next: HandleFunc| {
//!     handler_fn(move |ctx| {
//!         let next = Arc::clone(&next);
//!         Box::pin(async move {
//!             next(ctx).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "request done");
//!         })
//!     })
//! });
//! assert_eq!(timing.name(), "timing");
//! ```

use std::fmt;
use std::sync::Arc;

use tessera_core::HandleFunc;

/// The core middleware trait.
///
/// `wrap` is called once, when the pipeline is built. The returned step runs
/// for every request: code before `next(ctx).await` is the pre-logic, code
/// after it the post-logic.
///
/// # Invariants
///
/// - A middleware that does not call `next` short-circuits the chain and
///   should set the buffered status and body itself
/// - Middleware never writes the buffered response to the sink; the flush
///   step does that exactly once
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str;

    /// Wraps `next`, returning the step that replaces it.
    fn wrap(&self, next: HandleFunc) -> HandleFunc;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn wrap(&self, next: HandleFunc) -> HandleFunc {
        (**self).wrap(next)
    }
}

/// A middleware built from a closure.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a named middleware from `func`.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(HandleFunc) -> HandleFunc + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn wrap(&self, next: HandleFunc) -> HandleFunc {
        (self.func)(next)
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use tessera_core::{handler_fn, Context};

    #[tokio::test]
    async fn test_fn_middleware_short_circuits() {
        let deny = FnMiddleware::new("deny", |_next: HandleFunc| {
            handler_fn(|ctx| {
                Box::pin(async move {
                    ctx.set_resp_status(StatusCode::FORBIDDEN);
                })
            })
        });
        let handler = handler_fn(|ctx| Box::pin(async move { ctx.set_resp_data("secret") }));

        let step = deny.wrap(handler);
        let mut ctx = Context::default();
        step(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::FORBIDDEN));
        assert!(ctx.resp_data().is_empty());
    }

    #[test]
    fn test_arc_middleware_delegates_name() {
        let shared: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("shared", |next: HandleFunc| next));
        assert_eq!(shared.name(), "shared");
    }
}
