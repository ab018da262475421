//! # Trellis
//!
//! **A minimal HTTP server toolkit built around a fast request dispatcher**
//!
//! Trellis provides the pieces of an HTTP server as small, composable
//! crates:
//!
//! - **Routing** – a compressed prefix-tree router with `:param` and
//!   `*wildcard` patterns, where a more specific route always wins
//! - **Middleware** – an onion-model pipeline with short-circuiting,
//!   response replacement, and per-route chains inside global stages
//! - **Context pooling** – recycled per-request contexts with typed
//!   scratch state, lazy cookie parsing and one-shot body buffering
//! - **Transport** – a hyper HTTP/1 adapter with graceful shutdown,
//!   per-request deadlines and a fast map for fixed endpoints
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trellis::prelude::*;
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
//!
//! ## Dispatch order
//!
//! Every request flows through the same fixed sequence:
//!
//! ```text
//! Request → fast map → pooled context → route lookup → pipeline → render
//! ```
//!
//! The fast map answers exact (method, path) pairs before anything else is
//! touched; everything else acquires a recycled context, matches the route
//! tree and runs the middleware onion around the handler.

#![doc(html_root_url = "https://docs.rs/trellis/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use trellis_core as core;

// Re-export router types
pub use trellis_router as router;

// Re-export middleware types
pub use trellis_middleware as middleware;

// Re-export server types
pub use trellis_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use trellis::prelude::*;
/// ```
pub mod prelude {
    // `trellis_core::Result` is deliberately not re-exported: under a glob
    // import it would shadow `std::result::Result`. Reach it through
    // `trellis::core::Result` when wanted.
    pub use trellis_core::{
        BodyFuture, ContextPool, Error, PooledContext, RequestContext, RequestId, Response,
    };

    pub use trellis_router::{MethodMap, Params, RouteError, RouteMatch, Router};

    pub use trellis_middleware::{
        BoxFuture, BoxedMiddleware, FnMiddleware, Handler, HandlerChain, HandlerResult,
        Middleware, Next, Pipeline, Terminal,
    };

    pub use trellis_server::{Server, ServerConfig, ServerError, ShutdownSignal};
}
