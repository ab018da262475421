//! Compressed prefix-tree router for trellis.
//!
//! This crate provides path matching over a radix tree (compressed trie):
//! static path bytes are stored in compressed runs that split on insertion,
//! so lookup is a single O(k) walk over the path bytes where k is the path
//! length, independent of how many routes are registered.
//!
//! # Features
//!
//! - **Compressed trie**: shared prefixes are stored once and split lazily
//! - **Path parameters**: `:name` binds one segment (`/users/:id`)
//! - **Wildcards**: a terminal `*name` binds the path remainder (`/files/*path`)
//! - **Specificity**: static beats param beats wildcard at every branch point
//! - **Method routing**: one value per HTTP method at each path
//! - **Generic values**: the tree stores whatever the caller registers
//!
//! # Example
//!
//! ```rust
//! use trellis_router::{MethodMap, Router};
//! use http::Method;
//!
//! let mut router = Router::new();
//!
//! router.insert("/users", MethodMap::new().get("listUsers").post("createUser")).unwrap();
//! router.insert("/users/:id", MethodMap::new().get("getUser").delete("deleteUser")).unwrap();
//! router.insert("/files/*path", MethodMap::new().get("serveFile")).unwrap();
//!
//! let found = router.at(&Method::GET, "/users/123").unwrap();
//! assert_eq!(found.value, &"getUser");
//! assert_eq!(found.params.get("id"), Some("123"));
//! ```
//!
//! # Matching rules
//!
//! - Matching is byte-exact and case-sensitive; `/users` and `/users/` are
//!   different routes and neither is normalized into the other.
//! - A parameter never matches an empty segment; a wildcard may match the
//!   empty remainder when the path ends at its mount point.
//! - Parameter values are percent-decoded; wildcard values are bound raw.
//! - Routes that diverge mid-branch backtrack: bindings made along a failed
//!   branch never leak into the final parameter set.

mod error;
mod method_map;
mod node;
mod params;
mod router;

pub use error::RouteError;
pub use method_map::MethodMap;
pub use params::Params;
pub use router::{RouteMatch, Router};
