//! Route registration and lookup.

use http::Method;

use crate::error::RouteError;
use crate::method_map::MethodMap;
use crate::node::{parse_pattern, Node};
use crate::params::Params;

/// A successful route lookup.
///
/// Borrows the matched value from the router and carries the path
/// parameters bound along the matched pattern.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the matched (method, path) pair.
    pub value: &'a T,
    /// Path parameters bound during the match, in pattern order.
    pub params: Params,
}

/// A compressed prefix-tree router.
///
/// Routes are registered per HTTP method against patterns made of literal
/// segments, `:name` parameters and a terminal `*name` wildcard. Lookup is
/// a single walk over the path bytes; a more specific route always wins
/// over a less specific one (static over param, param over wildcard).
///
/// The stored value type is generic: the router knows nothing about
/// handlers, middleware or request bodies.
///
/// # Example
///
/// ```rust
/// use trellis_router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.route(Method::GET, "/users/:id", "getUser").unwrap();
///
/// let found = router.at(&Method::GET, "/users/42").unwrap();
/// assert_eq!(found.value, &"getUser");
/// assert_eq!(found.params.get("id"), Some("42"));
///
/// assert!(router.at(&Method::POST, "/users/42").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Router<T> {
    /// Root of the prefix tree.
    root: Node<T>,
    /// Number of registered (method, path) pairs.
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Registers a value for a single (method, pattern) pair.
    ///
    /// Registering the same pair twice replaces the earlier value.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] when the method is an extension method,
    /// when the pattern is malformed, or when it binds a parameter or
    /// wildcard name that conflicts with an existing route at the same
    /// position.
    pub fn route(&mut self, method: Method, pattern: &str, value: T) -> Result<(), RouteError> {
        let mut methods = MethodMap::new();
        if !methods.set(&method, value) {
            return Err(RouteError::UnsupportedMethod {
                pattern: pattern.to_string(),
                method: method.to_string(),
            });
        }
        self.insert(pattern, methods)
    }

    /// Registers a full method map at a pattern.
    ///
    /// Methods already registered at the pattern are overwritten by the
    /// ones set in `methods`; the rest are kept.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] when the pattern is malformed or conflicts
    /// with an existing route.
    pub fn insert(&mut self, pattern: &str, methods: MethodMap<T>) -> Result<(), RouteError> {
        let tokens = parse_pattern(pattern)?;
        self.root.insert(pattern, &tokens, methods)?;
        self.route_count += 1;
        Ok(())
    }

    /// Looks up the value registered for `method` at `path`.
    ///
    /// Returns `None` when no pattern matches the path, or when a pattern
    /// matches but has no value for this method.
    #[must_use]
    pub fn at(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let mut params = Params::new();
        let methods = self.root.find(path, &mut params)?;
        let value = methods.value(method)?;
        Some(RouteMatch { value, params })
    }

    /// Looks up the full method map matching `path`, ignoring the method.
    ///
    /// Useful for building `Allow` responses or introspection.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodMap<T>, Params)> {
        let mut params = Params::new();
        let methods = self.root.find(path, &mut params)?;
        Some((methods, params))
    }

    /// Returns the number of registrations made against this router.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}
