//! Hyper transport adapter and request dispatcher for trellis.
//!
//! This crate turns the transport-neutral pieces (router, pipeline,
//! context pool) into a running HTTP/1 server:
//!
//! - [`Server`]: route registration, the per-request dispatcher, and the
//!   accept loop with graceful shutdown
//! - [`ServerConfig`]: bind address, keep-alive, and the shutdown and
//!   per-request timeouts
//! - [`ShutdownSignal`] / [`ConnectionTracker`]: shutdown fan-out and
//!   connection draining
//!
//! Per request the dispatcher checks the fast map first, then acquires a
//! pooled context, fills it from the hyper request, matches the route,
//! runs the middleware pipeline, and renders the outcome. Errors escaping
//! the pipeline are caught here and rendered as JSON envelopes; nothing a
//! handler returns can crash the process.

mod config;
mod fast;
mod server;
mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_BIND_ADDR, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use server::{HttpResponse, ResponseBody, Server, ServerError};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
