//! Priority-zero fast-path responses.
//!
//! The fast map answers exact (method, path) pairs with a prebuilt
//! response, before the pool, the route tree, or any middleware is
//! touched. It suits fixed endpoints like health checks where the body
//! never varies.

use std::collections::HashMap;

use http::Method;
use trellis_core::Response;

/// Exact-match map of prebuilt responses.
///
/// Lookup is two hash probes (method, then path) on borrowed keys: no
/// pattern syntax, no parameters, no normalization, and no per-request
/// allocation on the hit path.
#[derive(Debug, Default)]
pub(crate) struct FastMap {
    entries: HashMap<Method, HashMap<String, Response>>,
}

impl FastMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a prebuilt response. Re-registering a pair replaces it.
    pub(crate) fn insert(&mut self, method: Method, path: impl Into<String>, response: Response) {
        self.entries
            .entry(method)
            .or_default()
            .insert(path.into(), response);
    }

    /// Returns the prebuilt response for an exact pair.
    pub(crate) fn get(&self, method: &Method, path: &str) -> Option<&Response> {
        self.entries.get(method)?.get(path)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_exact_match_only() {
        let mut map = FastMap::new();
        map.insert(Method::GET, "/healthz", Response::text(StatusCode::OK, "ok"));

        assert!(map.get(&Method::GET, "/healthz").is_some());
        assert!(map.get(&Method::POST, "/healthz").is_none());
        assert!(map.get(&Method::GET, "/healthz/").is_none());
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut map = FastMap::new();
        map.insert(Method::GET, "/v", Response::text(StatusCode::OK, "1"));
        map.insert(Method::GET, "/v", Response::text(StatusCode::OK, "2"));

        assert_eq!(map.len(), 1);
        let resp = map.get(&Method::GET, "/v").unwrap();
        assert_eq!(resp.body(), "2".as_bytes());
    }

    #[test]
    fn test_len_counts_across_methods() {
        let mut map = FastMap::new();
        map.insert(Method::GET, "/a", Response::empty(StatusCode::OK));
        map.insert(Method::POST, "/a", Response::empty(StatusCode::OK));
        map.insert(Method::GET, "/b", Response::empty(StatusCode::OK));

        assert_eq!(map.len(), 3);
    }
}
