//! HTTP server and per-request dispatcher.
//!
//! The server ties the pieces together: routes are registered into a
//! [`Router`] of handler chains, global middleware into a [`Pipeline`],
//! and per request the dispatcher checks the fast map, acquires a pooled
//! context, fills it from the transport, looks up the route, runs the
//! composed chain, and renders the outcome.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_server::{Server, ServerConfig};
//! use trellis_middleware::{BoxFuture, HandlerResult};
//! use trellis_core::RequestContext;
//! use http::{Method, StatusCode};
//!
//! fn greet(ctx: &mut RequestContext) -> BoxFuture<'_, HandlerResult> {
//!     Box::pin(async move {
//!         let name = ctx.param("name").unwrap_or("world").to_string();
//!         Ok(Some(ctx.text(StatusCode::OK, format!("Hello, {name}"))))
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::default());
//!     server.route(Method::GET, "/greet/:name", greet)?;
//!     server.listen().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;

use trellis_core::{BodyFuture, ContextPool, Error, RequestContext, RequestId, Response};
use trellis_middleware::{BoxedMiddleware, Handler, HandlerChain, Middleware, Pipeline, Terminal};
use trellis_router::{RouteError, Router};

use crate::config::ServerConfig;
use crate::fast::FastMap;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Type alias for the HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response handed to the transport.
pub type HttpResponse = http::Response<ResponseBody>;

/// Startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured bind address could not be parsed.
    #[error("invalid bind address {addr:?}: {source}")]
    InvalidAddr {
        /// The configured address string.
        addr: String,
        /// The parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The resolved socket address.
        addr: std::net::SocketAddr,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// The trellis HTTP server.
///
/// One server owns one router, one pipeline, one context pool and one
/// fast map; nothing is process-global, so several servers can run in
/// one process. Registration happens before [`listen`](Self::listen);
/// the routing structures are not mutated once traffic flows.
pub struct Server {
    /// Server configuration.
    config: ServerConfig,

    /// Route tree, storing a middleware chain per (method, path).
    router: Router<HandlerChain>,

    /// Global middleware, wrapped around every route chain.
    pipeline: Pipeline,

    /// Pool of recycled request contexts.
    pool: Arc<ContextPool>,

    /// Prebuilt exact-match responses, checked before everything else.
    fast: FastMap,
}

impl Server {
    /// Creates a server with the given configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            pipeline: Pipeline::new(),
            pool: Arc::new(ContextPool::default()),
            fast: FastMap::new(),
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the route tree.
    #[must_use]
    pub fn router(&self) -> &Router<HandlerChain> {
        &self.router
    }

    /// Registers a handler for a (method, pattern) pair.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed or conflicting patterns.
    pub fn route<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<(), RouteError> {
        self.route_with(method, pattern, Vec::new(), handler)
    }

    /// Registers a handler with route-specific middleware.
    ///
    /// The middleware run inside the global pipeline, in the given order,
    /// with the handler innermost.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for malformed or conflicting patterns.
    pub fn route_with<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        middleware: Vec<BoxedMiddleware>,
        handler: H,
    ) -> Result<(), RouteError> {
        let mut chain: HandlerChain = middleware;
        chain.push(Arc::new(Terminal::new(handler)));
        self.router.route(method, pattern, chain)
    }

    /// Adds a global middleware stage, wrapped around every route.
    pub fn wrap<M: Middleware>(&mut self, middleware: M) {
        self.pipeline.add(middleware);
    }

    /// Registers a prebuilt response for an exact (method, path) pair.
    ///
    /// Fast routes are answered before the pool, the route tree and all
    /// middleware; they are checked first on every request.
    pub fn fast_route(&mut self, method: Method, path: &str, response: Response) {
        self.fast.insert(method, path, response);
    }

    /// Runs the server until SIGTERM/SIGINT.
    ///
    /// # Errors
    ///
    /// Returns a [`ServerError`] if the listener cannot be bound.
    pub async fn listen(self) -> Result<(), ServerError> {
        self.listen_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Runs the server until the given shutdown signal triggers.
    ///
    /// After the signal, in-flight connections are drained, bounded by
    /// the configured shutdown timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`ServerError`] if the listener cannot be bound.
    pub async fn listen_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddr {
                addr: self.config.bind_addr().to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!(
            %addr,
            routes = self.router.len(),
            fast_routes = self.fast.len(),
            "listening"
        );

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.track();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.serve_connection(stream, shutdown).await {
                                    tracing::debug!(%remote, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                _ = shutdown.recv() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }

        let timeout = server.config.shutdown_timeout();
        tracing::info!(active = tracker.active(), "draining connections");

        tokio::select! {
            _ = tracker.drained() => {
                tracing::info!("all connections closed");
            }
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(active = tracker.active(), "shutdown timeout reached");
            }
        }

        Ok(())
    }

    /// Serves one connection until it closes or shutdown triggers.
    async fn serve_connection(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(req).await) }
        });

        let conn = http1::Builder::new()
            .keep_alive(self.config.keep_alive())
            .serve_connection(io, service);

        tokio::select! {
            result = conn => result,
            _ = shutdown.recv() => Ok(()),
        }
    }

    /// Dispatches one request under the configured deadline.
    ///
    /// A request that outlives the configured timeout is answered with a
    /// 504 envelope; the cancelled dispatch drops its pooled context on
    /// the way out, so the slot is recycled normally.
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match tokio::time::timeout(self.config.request_timeout(), self.dispatch(req)).await {
            Ok(resp) => resp,
            Err(_) => {
                tracing::warn!(%method, %path, "request timed out");
                envelope_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "REQUEST_TIMEOUT",
                    &format!("request deadline exceeded for {method} {path}"),
                    None,
                )
            }
        }
    }

    /// Dispatches one request: fast map, pool, fill, route lookup,
    /// pipeline, render.
    ///
    /// This is the transport-independent entry point; integration tests
    /// drive it directly with synthetic requests.
    pub async fn dispatch<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let method = parts.method;

        if let Some(resp) = self.fast.get(&method, parts.uri.path()) {
            tracing::debug!(%method, path = parts.uri.path(), "fast-path hit");
            return render_fast(resp);
        }

        let mut ctx = self.pool.acquire();

        let cookie_header = parts
            .headers
            .get(COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body_future: BodyFuture = Box::pin(async move {
            body.collect()
                .await
                .map(http_body_util::Collected::to_bytes)
                .map_err(|e| Error::body_read(e.to_string()))
        });

        ctx.fill(method, parts.uri, cookie_header, Some(body_future));

        tracing::debug!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            "dispatching"
        );

        let chain = match self.router.at(ctx.method(), ctx.path()) {
            Some(found) => {
                ctx.set_params(found.params);
                Some(found.value)
            }
            None => None,
        };

        let result = match chain {
            Some(chain) => self.pipeline.run(&mut ctx, chain).await,
            // Global middleware still observe unrouted requests.
            None => self.pipeline.run(&mut ctx, &[]).await,
        };

        match result {
            Ok(Some(resp)) => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    status = %resp.status(),
                    "request completed"
                );
                render_with_context(&ctx, resp)
            }
            Ok(None) => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    method = %ctx.method(),
                    path = %ctx.path(),
                    "no route matched"
                );
                envelope_response(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    &format!("no route for {} {}", ctx.method(), ctx.path()),
                    Some(ctx.request_id()),
                )
            }
            Err(err) => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    method = %ctx.method(),
                    path = %ctx.path(),
                    error = %err,
                    "handler error"
                );
                render_error(&ctx, &err)
            }
        }
        // `ctx` drops here and its slot returns to the pool.
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

/// Merges context-accumulated headers and cookies into the response.
///
/// The response's own headers win on name conflicts; context headers are
/// appended for names the response did not set, and every queued
/// `Set-Cookie` value is appended.
fn render_with_context(ctx: &RequestContext, resp: Response) -> HttpResponse {
    let (status, mut headers, body) = resp.into_parts();

    let own: Vec<HeaderName> = headers.keys().cloned().collect();
    for (name, value) in ctx.response_headers() {
        if !own.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    for cookie in ctx.response_cookies() {
        if let Ok(value) = HeaderValue::try_from(cookie.as_str()) {
            headers.append(SET_COOKIE, value);
        }
    }
    set_request_id(&mut headers, ctx.request_id());

    let mut out = http::Response::new(Full::new(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

/// Renders a pipeline error via its status mapping and envelope.
fn render_error(ctx: &RequestContext, err: &Error) -> HttpResponse {
    let envelope = err.to_envelope(Some(&ctx.request_id().to_string()));
    let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| b"{}".to_vec());

    let mut out = http::Response::new(Full::new(Bytes::from(body)));
    *out.status_mut() = err.status_code();
    out.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    set_request_id(out.headers_mut(), ctx.request_id());
    out
}

/// Renders a prebuilt fast-map entry from a borrowed reference.
///
/// The stored response is never consumed; only the `Bytes` handle and the
/// header map are cloned into the outgoing message.
fn render_fast(resp: &Response) -> HttpResponse {
    let mut out = http::Response::new(Full::new(resp.body().clone()));
    *out.status_mut() = resp.status();
    *out.headers_mut() = resp.headers().clone();
    out
}

/// Builds a JSON error-envelope response.
fn envelope_response(
    status: StatusCode,
    code: &str,
    message: &str,
    request_id: Option<RequestId>,
) -> HttpResponse {
    let mut body = serde_json::json!({
        "error": { "code": code, "message": message },
    });
    if let (Some(id), Some(map)) = (request_id, body.as_object_mut()) {
        map.insert(
            "request_id".to_string(),
            serde_json::Value::String(id.to_string()),
        );
    }

    let mut out = http::Response::new(Full::new(Bytes::from(body.to_string())));
    *out.status_mut() = status;
    out.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(id) = request_id {
        set_request_id(out.headers_mut(), id);
    }
    out
}

fn set_request_id(headers: &mut http::HeaderMap, id: RequestId) {
    if let Ok(value) = HeaderValue::try_from(id.to_string()) {
        headers.insert(HeaderName::from_static("x-request-id"), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use trellis_middleware::{BoxFuture, HandlerResult};

    fn ok_handler(ctx: &mut RequestContext) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move { Ok(Some(ctx.text(StatusCode::OK, "ok"))) })
    }

    #[test]
    fn test_route_registration() {
        let mut server = Server::default();
        server.route(Method::GET, "/users/:id", ok_handler).unwrap();
        server.route(Method::POST, "/users", ok_handler).unwrap();

        assert_eq!(server.router().len(), 2);
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        let mut server = Server::default();
        let err = server.route(Method::GET, "no-slash", ok_handler);
        assert!(matches!(err, Err(RouteError::MissingLeadingSlash { .. })));
    }

    #[test]
    fn test_wrap_adds_global_stage() {
        fn noop<'a>(
            ctx: &'a mut RequestContext,
            next: trellis_middleware::Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move { next.run(ctx).await })
        }

        let mut server = Server::default();
        server.wrap(trellis_middleware::FnMiddleware::new("noop", noop));
        assert_eq!(server.pipeline.stage_count(), 1);
    }

    #[tokio::test]
    async fn test_listen_invalid_address() {
        let server = Server::new(ServerConfig::builder().bind_addr("not-an-address").build());

        let result = server.listen_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::InvalidAddr { .. })));
    }

    #[tokio::test]
    async fn test_listen_and_shutdown() {
        let server = Server::new(
            ServerConfig::builder()
                .bind_addr("127.0.0.1:0")
                .shutdown_timeout(Duration::from_millis(100))
                .build(),
        );

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            server.listen_with_shutdown(shutdown),
        )
        .await;

        assert!(result.is_ok());
        assert!(result.unwrap().is_ok());
    }
}
