//! Terminal dispatch step.
//!
//! The dispatcher is the innermost step of every pipeline: it asks the router
//! for the request's handler, records the routing result on the context and
//! runs the handler.

use std::sync::Arc;

use http::StatusCode;
use tessera_core::{handler_fn, Context, HandleFunc, Params};
use tessera_router::Router;

/// Body sent when no handler matches.
pub const NOT_FOUND_BODY: &[u8] = b"NOT FOUND";

/// A router whose routes are bound to handlers.
pub type HandlerRouter = Router<HandleFunc>;

/// Builds the terminal step for `router`.
///
/// Routes on the percent-decoded path. A miss, a path that does not decode,
/// or a match on a node with nothing bound buffers `404 Not Found` with
/// [`NOT_FOUND_BODY`] and runs no handler.
#[must_use]
pub fn dispatcher(router: Arc<HandlerRouter>) -> HandleFunc {
    handler_fn(move |ctx| {
        let router = Arc::clone(&router);
        Box::pin(async move {
            let Some((handler, route, params)) = resolve(&router, ctx) else {
                tracing::debug!(method = %ctx.method(), path = %ctx.raw_path(), "no route matched");
                ctx.set_resp_status(StatusCode::NOT_FOUND);
                ctx.set_resp_data(NOT_FOUND_BODY);
                return;
            };

            ctx.set_path_params(params);
            if let Some(route) = route {
                ctx.set_matched_route(route);
            }
            handler(ctx).await;
        })
    })
}

fn resolve(router: &HandlerRouter, ctx: &Context) -> Option<(HandleFunc, Option<String>, Params)> {
    let matched = router.find_route(ctx.method(), ctx.routing_path()?)?;
    let handler = Arc::clone(matched.handler()?);
    let route = matched.route().map(str::to_string);
    Some((handler, route, matched.params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, Request};

    fn named(name: &'static str) -> HandleFunc {
        handler_fn(move |ctx| Box::pin(async move { ctx.set_resp_data(name) }))
    }

    fn router() -> Arc<HandlerRouter> {
        let mut router = Router::new();
        router.add_route(Method::GET, "/user", named("user")).unwrap();
        router.add_route(Method::GET, "/param/:id", named("param")).unwrap();
        router.add_route(Method::POST, "/order/create", named("create")).unwrap();
        router.add_route(Method::GET, "/café", named("cafe")).unwrap();
        Arc::new(router)
    }

    fn ctx(method: Method, path: &str) -> Context {
        Context::new(Request::builder().method(method).uri(path).body(Bytes::new()).unwrap())
    }

    #[tokio::test]
    async fn test_dispatch_sets_route_and_params() {
        let dispatch = dispatcher(router());
        let mut ctx = ctx(Method::GET, "/param/123?x=1");
        dispatch(&mut ctx).await;

        assert_eq!(ctx.resp_data(), b"param");
        assert_eq!(ctx.matched_route(), Some("/param/:id"));
        assert_eq!(ctx.path_value("id").unwrap(), "123");
        assert_eq!(ctx.resp_status(), None);
    }

    #[tokio::test]
    async fn test_dispatch_miss_is_not_found() {
        let dispatch = dispatcher(router());
        let mut ctx = ctx(Method::GET, "/missing");
        dispatch(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(ctx.resp_data(), NOT_FOUND_BODY);
        assert_eq!(ctx.matched_route(), None);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method_is_not_found() {
        let dispatch = dispatcher(router());
        let mut ctx = ctx(Method::DELETE, "/user");
        dispatch(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_dispatch_node_without_handler_is_not_found() {
        let dispatch = dispatcher(router());
        let mut ctx = ctx(Method::POST, "/order");
        dispatch(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(ctx.resp_data(), NOT_FOUND_BODY);
    }

    #[tokio::test]
    async fn test_dispatch_binds_decoded_param() {
        let dispatch = dispatcher(router());
        let mut ctx = ctx(Method::GET, "/param/hello%20world");
        dispatch(&mut ctx).await;

        assert_eq!(ctx.resp_data(), b"param");
        assert_eq!(ctx.path_value("id").unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_dispatch_matches_encoded_static_route() {
        let dispatch = dispatcher(router());
        let mut ctx = ctx(Method::GET, "/caf%C3%A9");
        dispatch(&mut ctx).await;

        assert_eq!(ctx.resp_status(), None);
        assert_eq!(ctx.resp_data(), b"cafe");
        assert_eq!(ctx.matched_route(), Some("/café"));
    }

    #[tokio::test]
    async fn test_dispatch_bad_escape_is_not_found() {
        let dispatch = dispatcher(router());
        let mut ctx = ctx(Method::GET, "/param/%zz");
        dispatch(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(ctx.matched_route(), None);
    }
}
