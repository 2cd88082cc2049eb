//! HTTP server.
//!
//! [`ServerBuilder`] collects routes, middleware and an optional template
//! engine, then freezes them into a [`Server`]. The server accepts
//! connections on a Tokio listener, serves each one with Hyper's HTTP/1
//! connection driver and runs every request through the composed pipeline.
//!
//! # Example
//!
//! ```rust,no_run
//! use tessera_core::handler_fn;
//! use tessera_middleware::stages::Recovery;
//! use tessera_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tessera_server::ServerError> {
//!     let mut builder = Server::builder();
//!     builder
//!         .get("/user/:id", handler_fn(|ctx| Box::pin(async move {
//!             let id = ctx.path_value("id").unwrap_or_default();
//!             ctx.set_resp_data(format!("user {id}"));
//!         })))?
//!         .use_middleware(Recovery::new());
//!
//!     builder.build().run().await
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tessera_core::{Context, HandleFunc, TemplateEngine};
use tessera_middleware::{dispatcher, BoxedMiddleware, HandlerRouter, Middleware, Pipeline};
use tessera_router::RouteError;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Type alias for the HTTP response.
pub type HttpResponse = Response<Full<Bytes>>;

/// Collects routes, middleware and settings for a [`Server`].
///
/// Registration methods return `Result<&mut Self, RouteError>` so a bad route
/// aborts startup with `?`.
pub struct ServerBuilder {
    config: ServerConfig,
    router: HandlerRouter,
    middleware: Vec<BoxedMiddleware>,
    template_engine: Option<Arc<dyn TemplateEngine>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl ServerBuilder {
    /// Creates a builder with `config` and nothing registered.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: HandlerRouter::new(),
            middleware: Vec::new(),
            template_engine: None,
        }
    }

    /// Replaces the server configuration.
    pub fn config(&mut self, config: ServerConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Registers `handler` for `method` and `pattern`.
    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: HandleFunc,
    ) -> Result<&mut Self, RouteError> {
        self.router.add_route(method, pattern, handler)?;
        Ok(self)
    }

    /// Registers a `GET` route.
    pub fn get(&mut self, pattern: &str, handler: HandleFunc) -> Result<&mut Self, RouteError> {
        self.route(Method::GET, pattern, handler)
    }

    /// Registers a `POST` route.
    pub fn post(&mut self, pattern: &str, handler: HandleFunc) -> Result<&mut Self, RouteError> {
        self.route(Method::POST, pattern, handler)
    }

    /// Registers a `PUT` route.
    pub fn put(&mut self, pattern: &str, handler: HandleFunc) -> Result<&mut Self, RouteError> {
        self.route(Method::PUT, pattern, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&mut self, pattern: &str, handler: HandleFunc) -> Result<&mut Self, RouteError> {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Appends a middleware. The first one registered runs outermost.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Installs the engine used by `Context::render`.
    pub fn template_engine(&mut self, engine: Arc<dyn TemplateEngine>) -> &mut Self {
        self.template_engine = Some(engine);
        self
    }

    /// Freezes the router and composes the pipeline.
    #[must_use]
    pub fn build(self) -> Server {
        let router = Arc::new(self.router);
        let pipeline = Pipeline::builder()
            .with_all(self.middleware)
            .build(dispatcher(Arc::clone(&router)));

        Server {
            config: self.config,
            router,
            pipeline,
            template_engine: self.template_engine,
        }
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("routes", &self.router.len())
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// A built HTTP server.
pub struct Server {
    config: ServerConfig,
    router: Arc<HandlerRouter>,
    pipeline: Pipeline,
    template_engine: Option<Arc<dyn TemplateEngine>>,
}

impl Server {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The frozen router.
    #[must_use]
    pub fn router(&self) -> &HandlerRouter {
        &self.router
    }

    /// The composed pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs one request through the pipeline and returns the response.
    ///
    /// The flush step always runs, so the buffered status and body are on
    /// the response whatever the handler did. A panic that no middleware
    /// catches propagates to the caller.
    pub async fn handle(&self, request: Request<Bytes>) -> HttpResponse {
        let mut ctx = Context::new(request).with_template_engine(self.template_engine.clone());
        self.pipeline.run(&mut ctx).await;
        ctx.into_writer().into_response()
    }

    /// Binds the configured address and serves until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::InvalidAddress {
                addr: format!("{}:{}", self.config.http_addr, self.config.http_port),
                reason: e.to_string(),
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// fires, then waits up to `shutdown_timeout` for open connections.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        for (method, pattern) in self.router.routes() {
            info!(%method, route = pattern, "Route registered");
        }
        info!(
            addr = %local_addr,
            middleware = ?self.pipeline.stage_names(),
            "Server listening"
        );

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();
        let limiter = Arc::new(Semaphore::new(server.config.max_connections));

        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&limiter).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                () = shutdown.recv() => break,
            };

            let (stream, remote_addr) = tokio::select! {
                result = listener.accept() => match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
                () = shutdown.recv() => break,
            };

            let server = Arc::clone(&server);
            let token = tracker.acquire();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = server.serve_connection(stream, remote_addr, shutdown).await {
                    debug!(%remote_addr, error = %e, "Connection error");
                }
                drop(permit);
                drop(token);
            });
        }

        info!("Shutdown signal received, stopping server");
        let shutdown_timeout = server.config.shutdown_timeout();
        info!(
            timeout = ?shutdown_timeout,
            active = tracker.active_connections(),
            "Waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => info!("All connections closed"),
            () = tokio::time::sleep(shutdown_timeout) => warn!(
                active = tracker.active_connections(),
                "Shutdown timeout reached"
            ),
        }

        info!("Server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        debug!(%remote_addr, "Connection accepted");
        let io = TokioIo::new(stream);
        let keep_alive = self.config.keep_alive;
        let server = self;

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_incoming(req).await) }
        });

        let conn = http1::Builder::new()
            .keep_alive(keep_alive)
            .serve_connection(io, service);
        let mut conn = std::pin::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                debug!(%remote_addr, "Closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_incoming(&self, req: Request<Incoming>) -> HttpResponse {
        let timeout = self.config.request_timeout();
        let (parts, body) = req.into_parts();

        let body = match tokio::time::timeout(timeout, body.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read request body");
                return plain(StatusCode::BAD_REQUEST, "failed to read request body");
            }
            Err(_) => {
                warn!(path = %parts.uri.path(), "Request body timed out");
                return plain(StatusCode::REQUEST_TIMEOUT, "request body timed out");
            }
        };

        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        match tokio::time::timeout(timeout, self.handle(Request::from_parts(parts, body))).await {
            Ok(response) => response,
            Err(_) => {
                warn!(%method, %path, "Request timed out");
                plain(StatusCode::GATEWAY_TIMEOUT, "request timed out")
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("routes", &self.router.len())
            .field("middleware", &self.pipeline.stage_names())
            .finish_non_exhaustive()
    }
}

fn plain(status: StatusCode, body: &'static str) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::handler_fn;
    use tessera_middleware::stages::Recovery;
    use tessera_middleware::FnMiddleware;

    fn request(method: Method, uri: &str) -> Request<Bytes> {
        Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
    }

    async fn body_string(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_handle_routes_and_binds_params() {
        let mut builder = Server::builder();
        builder
            .get("/user/:id", handler_fn(|ctx| Box::pin(async move {
                let id = ctx.path_value("id").unwrap();
                ctx.set_resp_data(format!("user {id}"));
            })))
            .unwrap()
            .post("/user", handler_fn(|ctx| Box::pin(async move {
                ctx.set_resp_status(StatusCode::CREATED);
            })))
            .unwrap();
        let server = builder.build();

        let response = server.handle(request(Method::GET, "/user/42")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "user 42");

        let response = server.handle(request(Method::POST, "/user")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_handle_not_found() {
        let server = Server::builder().build();
        let response = server.handle(request(Method::GET, "/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "NOT FOUND");
    }

    #[test]
    fn test_duplicate_route_is_an_error() {
        let noop = || handler_fn(|_ctx| Box::pin(async {}));
        let mut builder = Server::builder();
        builder.get("/a", noop()).unwrap();
        let err = builder.get("/a", noop()).err().unwrap();
        assert!(matches!(err, RouteError::Duplicate { .. }));
        // Same pattern under another method is fine.
        assert!(builder.post("/a", noop()).is_ok());
    }

    #[tokio::test]
    async fn test_middleware_order() {
        let tag = |name: &'static str| {
            FnMiddleware::new(name, move |next: HandleFunc| {
                handler_fn(move |ctx| {
                    let next = Arc::clone(&next);
                    Box::pin(async move {
                        next(ctx).await;
                        let mut data = ctx.resp_data().to_vec();
                        data.extend_from_slice(name.as_bytes());
                        ctx.set_resp_data(data);
                    })
                })
            })
        };

        let mut builder = Server::builder();
        builder
            .get("/", handler_fn(|ctx| Box::pin(async move { ctx.set_resp_data("h") })))
            .unwrap();
        builder.use_middleware(tag("1")).use_middleware(tag("2"));
        let server = builder.build();
        assert_eq!(server.pipeline().stage_names(), vec!["1", "2"]);

        let response = server.handle(request(Method::GET, "/")).await;
        assert_eq!(body_string(response).await, "h21");
    }

    #[tokio::test]
    async fn test_recovery_turns_panic_into_500() {
        let mut builder = Server::builder();
        builder
            .get("/boom", handler_fn(|_ctx| Box::pin(async move { panic!("boom") })))
            .unwrap();
        builder.use_middleware(Recovery::new());
        let server = builder.build();

        let response = server.handle(request(Method::GET, "/boom")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = ShutdownSignal::new();
        let config = ServerConfig::builder()
            .shutdown_timeout(std::time::Duration::from_secs(1))
            .build();

        let server = ServerBuilder::new(config).build();
        let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

        shutdown.trigger();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let config = ServerConfig::builder().http_addr("not-an-ip").build();
        let err = ServerBuilder::new(config)
            .build()
            .run_with_shutdown(ShutdownSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { .. }));
    }
}
