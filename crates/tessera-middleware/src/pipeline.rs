//! Middleware composition.
//!
//! A [`Pipeline`] is built once from an ordered list of middleware and a
//! terminal step. Composition folds the list from last to first, so on the
//! way in middleware run in registration order and on the way out in reverse:
//!
//! ```text
//! flush → A.pre → B.pre → terminal → B.post → A.post → flush writes
//! ```
//!
//! The flush step is always the outermost wrapper. It runs the composed chain
//! and then writes the buffered status and body to the response sink, however
//! many middleware short-circuited on the way.

use std::fmt;
use std::sync::Arc;

use tessera_core::{handler_fn, Context, HandleFunc};

use crate::middleware::Middleware;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A composed middleware chain with its terminal step.
///
/// # Example
///
/// ```
/// use tessera_core::{handler_fn, Context};
/// use tessera_middleware::{Pipeline, stages::ErrorPages};
/// use http::StatusCode;
///
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let terminal = handler_fn(|ctx| {
///     Box::pin(async move { ctx.set_resp_status(StatusCode::NOT_FOUND) })
/// });
/// let pipeline = Pipeline::builder()
///     .with(ErrorPages::new().register(StatusCode::NOT_FOUND, "gone"))
///     .build(terminal);
///
/// let mut ctx = Context::default();
/// pipeline.run(&mut ctx).await;
/// assert_eq!(ctx.writer().body(), b"gone");
/// # });
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
    chain: HandleFunc,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs the chain for one request and flushes the buffered response.
    pub async fn run(&self, ctx: &mut Context) {
        (self.chain)(ctx).await;
    }

    /// The composed step, flush included.
    #[must_use]
    pub fn handler(&self) -> HandleFunc {
        Arc::clone(&self.chain)
    }

    /// Returns the names of the middleware in registration order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of middleware.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware.
    #[must_use]
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware.
    #[must_use]
    pub fn with_arc(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Appends several shared middleware, keeping their order.
    #[must_use]
    pub fn with_all(mut self, middleware: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        self.stages.extend(middleware);
        self
    }

    /// Composes the middleware around `terminal`.
    #[must_use]
    pub fn build(self, terminal: HandleFunc) -> Pipeline {
        let chain = compose(&self.stages, terminal);
        Pipeline {
            stages: self.stages,
            chain: flush_step(chain),
        }
    }
}

/// Folds `stages` around `terminal`, last stage innermost.
#[must_use]
pub fn compose(stages: &[BoxedMiddleware], terminal: HandleFunc) -> HandleFunc {
    stages
        .iter()
        .rev()
        .fold(terminal, |next, middleware| middleware.wrap(next))
}

/// Wraps `chain` so the buffered response is flushed after it returns.
fn flush_step(chain: HandleFunc) -> HandleFunc {
    handler_fn(move |ctx| {
        let chain = Arc::clone(&chain);
        Box::pin(async move {
            chain(ctx).await;
            ctx.flush();
        })
    })
}
