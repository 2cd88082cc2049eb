//! Status-specific response bodies.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tessera_core::{handler_fn, HandleFunc};

use crate::middleware::Middleware;

/// Replaces the buffered body for registered status codes.
///
/// Runs after the rest of the chain, so it also rewrites the dispatcher's
/// `404` and a [`Recovery`](super::Recovery) stage's `500` when those run
/// inside it.
#[derive(Debug, Clone, Default)]
pub struct ErrorPages {
    pages: HashMap<StatusCode, Bytes>,
}

impl ErrorPages {
    /// Creates a stage with no pages registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `body` for `status`.
    #[must_use]
    pub fn register(mut self, status: StatusCode, body: impl Into<Bytes>) -> Self {
        self.pages.insert(status, body.into());
        self
    }
}

impl Middleware for ErrorPages {
    fn name(&self) -> &'static str {
        "error_pages"
    }

    fn wrap(&self, next: HandleFunc) -> HandleFunc {
        let pages = Arc::new(self.pages.clone());
        handler_fn(move |ctx| {
            let next = Arc::clone(&next);
            let pages = Arc::clone(&pages);
            Box::pin(async move {
                next(ctx).await;
                if let Some(body) = ctx.resp_status().and_then(|s| pages.get(&s)) {
                    ctx.set_resp_data(body.clone());
                }
            })
        })
    }
}
