//! Middleware pipeline for trellis.
//!
//! This crate provides the onion-model middleware layer: the
//! [`Middleware`] trait, the consuming [`Next`] continuation, and the
//! [`Pipeline`] composer that wraps global stages around each route's own
//! chain.
//!
//! # Semantics
//!
//! - Stages wrap the request in registration order: the first stage added
//!   sees the request first and the response last.
//! - A stage short-circuits by returning without calling [`Next::run`];
//!   everything below it is skipped, everything above it still unwinds.
//! - A stage may replace the response produced downstream.
//! - Reaching the center without a response falls through with `Ok(None)`,
//!   which the dispatcher renders as not-found.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_middleware::{BoxFuture, HandlerResult, HandlerChain, Pipeline, Terminal};
//! use trellis_core::RequestContext;
//! use http::StatusCode;
//!
//! fn hello(ctx: &mut RequestContext) -> BoxFuture<'_, HandlerResult> {
//!     Box::pin(async move { Ok(Some(ctx.text(StatusCode::OK, "hello"))) })
//! }
//!
//! # tokio_test::block_on(async {
//! let pipeline = Pipeline::new();
//! let chain: HandlerChain = vec![Arc::new(Terminal::new(hello))];
//!
//! let mut ctx = RequestContext::new();
//! let resp = pipeline.run(&mut ctx, &chain).await.unwrap().unwrap();
//! assert_eq!(resp.status(), StatusCode::OK);
//! # });
//! ```

mod middleware;
mod pipeline;

pub use middleware::{BoxFuture, FnMiddleware, Handler, HandlerResult, Middleware, Next, Terminal};
pub use pipeline::{BoxedMiddleware, HandlerChain, Pipeline};
