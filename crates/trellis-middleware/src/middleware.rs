//! Core middleware trait and continuation types.
//!
//! Middleware wrap the request in onion order: each stage sees the context
//! on the way in, calls [`Next::run`] to hand control downstream, and sees
//! the outcome on the way out. A stage that returns without calling `run`
//! short-circuits everything below it.
//!
//! # Example
//!
//! ```
//! use trellis_middleware::{BoxFuture, HandlerResult, Middleware, Next};
//! use trellis_core::RequestContext;
//!
//! struct ServerHeader;
//!
//! impl Middleware for ServerHeader {
//!     fn name(&self) -> &'static str {
//!         "server-header"
//!     }
//!
//!     fn handle<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async move {
//!             ctx.add_header(
//!                 http::header::SERVER,
//!                 http::HeaderValue::from_static("trellis"),
//!             );
//!             next.run(ctx).await
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use trellis_core::{Error, RequestContext, Response};

/// A boxed future, as returned by middleware and handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The outcome of a middleware stage or handler.
///
/// - `Ok(Some(response))`: a response was produced.
/// - `Ok(None)`: fall through; the dispatcher renders not-found.
/// - `Err(e)`: caught once at the dispatcher boundary and rendered via
///   the error's status mapping.
pub type HandlerResult = Result<Option<Response>, Error>;

/// A middleware stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once; `Next` consumes itself to
///   enforce this.
/// - A stage that skips `next.run()` short-circuits the chain below it.
/// - A stage may replace or modify the response produced downstream
///   before returning it upward.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, calling `next` to continue the chain.
    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult>;
}

/// A route handler: the innermost stage of a chain.
///
/// Implemented for any `Fn(&mut RequestContext) -> BoxFuture<'_, HandlerResult>`,
/// so a plain `fn` item works directly:
///
/// ```
/// use trellis_middleware::{BoxFuture, Handler, HandlerResult};
/// use trellis_core::RequestContext;
/// use http::StatusCode;
///
/// fn greet(ctx: &mut RequestContext) -> BoxFuture<'_, HandlerResult> {
///     Box::pin(async move {
///         let name = ctx.param("name").unwrap_or("world").to_string();
///         Ok(Some(ctx.text(StatusCode::OK, format!("Hello, {name}"))))
///     })
/// }
///
/// let handler: &dyn Handler = &greet;
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Produces the handler outcome for this request.
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HandlerResult> {
        self(ctx)
    }
}

/// Adapts a [`Handler`] into the innermost [`Middleware`] of a chain.
///
/// The continuation passed to a terminal stage is ignored: a handler is
/// by definition the end of the onion.
pub struct Terminal<H> {
    handler: H,
}

impl<H> Terminal<H> {
    /// Wraps a handler as a terminal stage.
    pub const fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<H: Handler> Middleware for Terminal<H> {
    fn name(&self) -> &'static str {
        "handler"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        _next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        self.handler.call(ctx)
    }
}

/// Continuation to the next stage in the chain.
///
/// Consumed by [`run`](Next::run), so a stage can invoke its downstream
/// at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More stages below.
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain with no handler: fall through with `Ok(None)`.
    FallThrough,
}

impl<'a> Next<'a> {
    /// Creates a continuation that invokes `middleware` with `next` below it.
    #[must_use]
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates the default terminal continuation, which falls through.
    #[must_use]
    pub const fn fall_through() -> Self {
        Self {
            inner: NextInner::FallThrough,
        }
    }

    /// Invokes the next stage in the chain.
    pub async fn run(self, ctx: &mut RequestContext) -> HandlerResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.handle(ctx, *next).await,
            NextInner::FallThrough => Ok(None),
        }
    }
}

/// A middleware built from a function.
///
/// The function receives the context and the continuation and returns a
/// boxed future; a plain `fn` item satisfies the bound:
///
/// ```
/// use trellis_middleware::{BoxFuture, FnMiddleware, HandlerResult, Next};
/// use trellis_core::RequestContext;
///
/// fn passthrough<'a>(
///     ctx: &'a mut RequestContext,
///     next: Next<'a>,
/// ) -> BoxFuture<'a, HandlerResult> {
///     Box::pin(async move { next.run(ctx).await })
/// }
///
/// let mw = FnMiddleware::new("passthrough", passthrough);
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a named function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.func)(ctx, next)
    }
}
