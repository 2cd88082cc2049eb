//! Handler function types.
//!
//! A handler takes the per-request [`Context`] and reports everything through
//! it; there is no return value. Handlers are stored as [`HandleFunc`] so the
//! router, the middleware chain and the server can share them across tasks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::Context;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared request handler.
///
/// Middleware produce new `HandleFunc`s by wrapping existing ones, so this is
/// also the type of every step in a composed pipeline.
pub type HandleFunc = Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync>;

/// Turns a closure into a [`HandleFunc`].
///
/// The closure must return a boxed future borrowing the context, which is
/// what `Box::pin(async move { .. })` produces.
///
/// # Example
///
/// ```
/// use tessera_core::{handler_fn, HandleFunc};
///
/// let hello: HandleFunc = handler_fn(|ctx| {
///     Box::pin(async move {
///         ctx.set_resp_data("hello");
///     })
/// });
/// ```
pub fn handler_fn<F>(f: F) -> HandleFunc
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    Arc::new(f)
}
