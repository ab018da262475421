//! Per-method route values.
//!
//! This module provides [`MethodMap`] which holds one route value per HTTP
//! method for a single path. It supports all standard HTTP methods and
//! provides a fluent builder API.

use http::Method;

/// Maps HTTP methods to route values for a single path.
///
/// The value type is generic: the tree stores whatever the caller registers
/// per (method, path), typically a handler chain.
///
/// # Example
///
/// ```rust
/// use trellis_router::MethodMap;
/// use http::Method;
///
/// let map = MethodMap::new()
///     .get("listUsers")
///     .post("createUser");
///
/// assert_eq!(map.value(&Method::GET), Some(&"listUsers"));
/// assert_eq!(map.value(&Method::POST), Some(&"createUser"));
/// assert_eq!(map.value(&Method::DELETE), None);
/// ```
#[derive(Debug, Clone)]
pub struct MethodMap<T> {
    /// GET value
    get: Option<T>,
    /// POST value
    post: Option<T>,
    /// PUT value
    put: Option<T>,
    /// DELETE value
    delete: Option<T>,
    /// PATCH value
    patch: Option<T>,
    /// HEAD value
    head: Option<T>,
    /// OPTIONS value
    options: Option<T>,
    /// TRACE value
    trace: Option<T>,
    /// CONNECT value
    connect: Option<T>,
}

impl<T> Default for MethodMap<T> {
    fn default() -> Self {
        Self {
            get: None,
            post: None,
            put: None,
            delete: None,
            patch: None,
            head: None,
            options: None,
            trace: None,
            connect: None,
        }
    }
}

impl<T> MethodMap<T> {
    /// Creates a new empty method map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a GET value.
    #[must_use]
    pub fn get(mut self, value: T) -> Self {
        self.get = Some(value);
        self
    }

    /// Registers a POST value.
    #[must_use]
    pub fn post(mut self, value: T) -> Self {
        self.post = Some(value);
        self
    }

    /// Registers a PUT value.
    #[must_use]
    pub fn put(mut self, value: T) -> Self {
        self.put = Some(value);
        self
    }

    /// Registers a DELETE value.
    #[must_use]
    pub fn delete(mut self, value: T) -> Self {
        self.delete = Some(value);
        self
    }

    /// Registers a PATCH value.
    #[must_use]
    pub fn patch(mut self, value: T) -> Self {
        self.patch = Some(value);
        self
    }

    /// Registers a HEAD value.
    #[must_use]
    pub fn head(mut self, value: T) -> Self {
        self.head = Some(value);
        self
    }

    /// Registers an OPTIONS value.
    #[must_use]
    pub fn options(mut self, value: T) -> Self {
        self.options = Some(value);
        self
    }

    /// Registers a value for a specific method.
    ///
    /// Returns false for extension methods, which have no slot here; the
    /// value is dropped and the map is unchanged. Callers registering on
    /// behalf of a user surface that as a configuration error.
    pub fn set(&mut self, method: &Method, value: T) -> bool {
        match *method {
            Method::GET => self.get = Some(value),
            Method::POST => self.post = Some(value),
            Method::PUT => self.put = Some(value),
            Method::DELETE => self.delete = Some(value),
            Method::PATCH => self.patch = Some(value),
            Method::HEAD => self.head = Some(value),
            Method::OPTIONS => self.options = Some(value),
            Method::TRACE => self.trace = Some(value),
            Method::CONNECT => self.connect = Some(value),
            _ => return false,
        }
        true
    }

    /// Returns the value for a given HTTP method.
    #[must_use]
    pub fn value(&self, method: &Method) -> Option<&T> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::POST => self.post.as_ref(),
            Method::PUT => self.put.as_ref(),
            Method::DELETE => self.delete.as_ref(),
            Method::PATCH => self.patch.as_ref(),
            Method::HEAD => self.head.as_ref(),
            Method::OPTIONS => self.options.as_ref(),
            Method::TRACE => self.trace.as_ref(),
            Method::CONNECT => self.connect.as_ref(),
            _ => None,
        }
    }

    /// Returns true if no method has a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.get.is_none()
            && self.post.is_none()
            && self.put.is_none()
            && self.delete.is_none()
            && self.patch.is_none()
            && self.head.is_none()
            && self.options.is_none()
            && self.trace.is_none()
            && self.connect.is_none()
    }

    /// Returns the methods that have a value registered.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods = Vec::new();
        if self.get.is_some() {
            methods.push(Method::GET);
        }
        if self.post.is_some() {
            methods.push(Method::POST);
        }
        if self.put.is_some() {
            methods.push(Method::PUT);
        }
        if self.delete.is_some() {
            methods.push(Method::DELETE);
        }
        if self.patch.is_some() {
            methods.push(Method::PATCH);
        }
        if self.head.is_some() {
            methods.push(Method::HEAD);
        }
        if self.options.is_some() {
            methods.push(Method::OPTIONS);
        }
        if self.trace.is_some() {
            methods.push(Method::TRACE);
        }
        if self.connect.is_some() {
            methods.push(Method::CONNECT);
        }
        methods
    }

    /// Merges another method map into this one.
    ///
    /// Methods set in `other` replace any existing entry here: the last
    /// registration for a (method, path) pair wins.
    pub fn merge(&mut self, other: Self) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        take!(get);
        take!(post);
        take!(put);
        take!(delete);
        take!(patch);
        take!(head);
        take!(options);
        take!(trace);
        take!(connect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_map_fluent() {
        let map = MethodMap::new().get("a").post("b").delete("c");
        assert_eq!(map.value(&Method::GET), Some(&"a"));
        assert_eq!(map.value(&Method::POST), Some(&"b"));
        assert_eq!(map.value(&Method::DELETE), Some(&"c"));
        assert_eq!(map.value(&Method::PUT), None);
    }

    #[test]
    fn test_method_map_set() {
        let mut map = MethodMap::new();
        assert!(map.set(&Method::PATCH, 7));
        assert_eq!(map.value(&Method::PATCH), Some(&7));
    }

    #[test]
    fn test_method_map_is_empty() {
        let map: MethodMap<&str> = MethodMap::new();
        assert!(map.is_empty());

        let map = map.get("x");
        assert!(!map.is_empty());
    }

    #[test]
    fn test_method_map_allowed_methods() {
        let map = MethodMap::new().get("a").put("b");
        assert_eq!(map.allowed_methods(), vec![Method::GET, Method::PUT]);
    }

    #[test]
    fn test_method_map_merge_overwrites() {
        let mut map = MethodMap::new().get("old").post("keep");
        map.merge(MethodMap::new().get("new"));

        assert_eq!(map.value(&Method::GET), Some(&"new"));
        assert_eq!(map.value(&Method::POST), Some(&"keep"));
    }

    #[test]
    fn test_method_map_rejects_extension_method() {
        let mut map = MethodMap::new();
        let custom = Method::from_bytes(b"PURGE").unwrap();
        assert!(!map.set(&custom, 1));
        assert_eq!(map.value(&custom), None);
        assert!(map.is_empty());
    }
}
