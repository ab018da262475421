//! Core types for the trellis HTTP toolkit.
//!
//! This crate provides the types shared by every layer of trellis:
//!
//! - [`Response`]: a transport-neutral status/headers/body triple
//! - [`Error`]: the request-time error type, with HTTP status mapping
//!   and a serializable envelope
//! - [`RequestContext`]: per-request state flowing through the pipeline,
//!   from request facts and path params to typed scratch state and the
//!   accumulated response headers and cookies
//! - [`ContextPool`] / [`PooledContext`]: context recycling with
//!   guaranteed release on every exit path
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{ContextPool, Response};
//! use http::{Method, StatusCode};
//!
//! let pool = Arc::new(ContextPool::default());
//!
//! let mut ctx = pool.acquire();
//! ctx.fill(Method::GET, "/greet?name=Ada".parse().unwrap(), None, None);
//!
//! let name = ctx.query_value("name").unwrap_or("world").to_string();
//! let resp = ctx.text(StatusCode::OK, format!("Hello, {name}"));
//! assert_eq!(resp.status(), StatusCode::OK);
//! ```

mod context;
mod error;
mod pool;
mod response;

pub use context::{BodyFuture, RequestContext, RequestId};
pub use error::{Error, ErrorDetail, ErrorEnvelope, Result};
pub use pool::{ContextPool, PooledContext};
pub use response::Response;
