//! Per-request context.
//!
//! The [`RequestContext`] carries all per-request state through the
//! middleware pipeline and into handlers: the request facts filled in by
//! the transport adapter, the path parameters bound by the router, typed
//! scratch state middleware leave for each other, and the response headers
//! and cookies accumulated along the way.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use trellis_router::Params;
use uuid::Uuid;

use crate::error::Error;
use crate::response::Response;

/// One-shot future resolving to the buffered request body.
///
/// Installed by the transport adapter at fill time and consumed at most
/// once by [`RequestContext::read_body`].
pub type BodyFuture = Pin<Box<dyn Future<Output = Result<Bytes, Error>> + Send + 'static>>;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use trellis_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RequestId> for Uuid {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// Parses a `Cookie` header into name/value pairs.
fn parse_cookie_header(raw: &str) -> Result<HashMap<String, String>, Error> {
    let mut cookies = HashMap::new();
    for pair in raw.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((name, value)) = pair.split_once('=') else {
            return Err(Error::invalid_cookie(format!("malformed pair {pair:?}")));
        };
        let value = urlencoding::decode(value).map_err(|e| {
            Error::invalid_cookie(format!("cookie {name:?} is not valid UTF-8: {e}"))
        })?;
        cookies.insert(name.to_string(), value.into_owned());
    }
    Ok(cookies)
}

/// Per-request state that flows through the middleware pipeline.
///
/// A context is not built per request: the pool hands out recycled
/// instances, reset to a neutral baseline on acquire, and the transport
/// adapter fills in the request facts before dispatch. Handlers and
/// middleware only ever see a filled context.
///
/// State left by middleware for downstream handlers lives in a typed
/// extension map keyed by `TypeId`, so there are no stringly-typed keys
/// and no accidental collisions between crates.
///
/// # Example
///
/// ```
/// use trellis_core::RequestContext;
/// use http::StatusCode;
///
/// #[derive(Debug, PartialEq)]
/// struct AuthedUser(String);
///
/// let mut ctx = RequestContext::new();
/// ctx.set(AuthedUser("ada".into()));
///
/// assert_eq!(ctx.get::<AuthedUser>(), Some(&AuthedUser("ada".into())));
/// let resp = ctx.text(StatusCode::OK, "hello");
/// assert!(ctx.responded());
/// ```
pub struct RequestContext {
    /// Unique identifier for this request, refreshed on every acquire.
    request_id: RequestId,

    /// Request method.
    method: Method,

    /// Request URI (path + query as received).
    uri: Uri,

    /// Path parameters bound by the router.
    params: Params,

    /// Query pairs, parsed once at fill time. Multi-valued keys keep
    /// every occurrence in order.
    query: Vec<(String, String)>,

    /// Typed scratch state for middleware/handler communication.
    state: HashMap<TypeId, Box<dyn Any + Send + Sync>>,

    /// Headers accumulated for the outgoing response.
    response_headers: HeaderMap,

    /// `Set-Cookie` values accumulated for the outgoing response.
    response_cookies: Vec<String>,

    /// Whether a response-producing helper has run.
    responded: bool,

    /// Raw `Cookie` header captured at fill time.
    cookie_header: Option<String>,

    /// Cookies parsed lazily from `cookie_header`.
    cookies: Option<HashMap<String, String>>,

    /// One-shot body source installed by the transport adapter.
    body_future: Option<BodyFuture>,

    /// Body bytes, cached after the first read.
    body: Option<Bytes>,

    /// When this context was last acquired.
    started_at: Instant,
}

impl RequestContext {
    /// Creates a new, unfilled context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            method: Method::GET,
            uri: Uri::default(),
            params: Params::new(),
            query: Vec::new(),
            state: HashMap::new(),
            response_headers: HeaderMap::new(),
            response_cookies: Vec::new(),
            responded: false,
            cookie_header: None,
            cookies: None,
            body_future: None,
            body: None,
            started_at: Instant::now(),
        }
    }

    /// Resets the context to its neutral baseline for reuse.
    ///
    /// Everything request-scoped is cleared and the request ID is
    /// refreshed; allocated capacity is retained where possible.
    pub fn reset(&mut self) {
        self.request_id = RequestId::new();
        self.method = Method::GET;
        self.uri = Uri::default();
        self.params.clear();
        self.query.clear();
        self.state.clear();
        self.response_headers.clear();
        self.response_cookies.clear();
        self.responded = false;
        self.cookie_header = None;
        self.cookies = None;
        self.body_future = None;
        self.body = None;
        self.started_at = Instant::now();
    }

    /// Fills the context with the facts of an incoming request.
    ///
    /// Called by the transport adapter before dispatch. The query string
    /// is parsed once here; a query that fails to parse is treated as
    /// empty rather than failing the request.
    pub fn fill(
        &mut self,
        method: Method,
        uri: Uri,
        cookie_header: Option<String>,
        body: Option<BodyFuture>,
    ) {
        self.query = uri
            .query()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default();
        self.method = method;
        self.uri = uri;
        self.cookie_header = cookie_header;
        self.body_future = body;
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the elapsed time since this context was acquired.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    // ---- path parameters ------------------------------------------------

    /// Returns the path parameters bound by the router.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Returns a single path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Replaces the bound path parameters. Called by the dispatcher after
    /// a route match.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    // ---- query string ---------------------------------------------------

    /// Returns all query pairs in request order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the first query value for `name`.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every query value for `name`, in request order.
    #[must_use]
    pub fn query_all(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    // ---- typed scratch state ---------------------------------------------

    /// Stores a typed value, replacing any previous value of the same type.
    pub fn set<T: Send + Sync + 'static>(&mut self, value: T) {
        self.state.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a reference to the stored value of type `T`, if any.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.state
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Returns a mutable reference to the stored value of type `T`, if any.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.state
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut::<T>())
    }

    /// Removes and returns the stored value of type `T`, if any.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.state
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns true if a value of type `T` is stored.
    #[must_use]
    pub fn has<T: Send + Sync + 'static>(&self) -> bool {
        self.state.contains_key(&TypeId::of::<T>())
    }

    // ---- cookies ----------------------------------------------------------

    /// Returns the request cookies, parsing the `Cookie` header on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCookie`] when the header is malformed or a
    /// value does not percent-decode to valid UTF-8.
    pub fn cookies(&mut self) -> Result<&HashMap<String, String>, Error> {
        if self.cookies.is_none() {
            let parsed = match self.cookie_header.as_deref() {
                Some(raw) => parse_cookie_header(raw)?,
                None => HashMap::new(),
            };
            self.cookies = Some(parsed);
        }
        Ok(self.cookies.get_or_insert_with(HashMap::new))
    }

    /// Returns a single request cookie by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCookie`] when the header cannot be parsed.
    pub fn cookie(&mut self, name: &str) -> Result<Option<&str>, Error> {
        Ok(self.cookies()?.get(name).map(String::as_str))
    }

    // ---- request body -----------------------------------------------------

    /// Reads and buffers the request body.
    ///
    /// The transport body is consumed on the first call; later calls
    /// return the cached bytes. A context with no body source yields an
    /// empty body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyRead`] when the transport fails mid-body.
    pub async fn read_body(&mut self) -> Result<Bytes, Error> {
        if let Some(body) = &self.body {
            return Ok(body.clone());
        }
        let bytes = match self.body_future.take() {
            Some(fut) => fut.await?,
            None => Bytes::new(),
        };
        self.body = Some(bytes.clone());
        Ok(bytes)
    }

    /// Reads the body and deserializes it as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyRead`] when the transport fails, or
    /// [`Error::InvalidJson`] when the bytes are not the expected JSON.
    pub async fn body_json<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let bytes = self.read_body().await?;
        serde_json::from_slice(&bytes).map_err(Error::InvalidJson)
    }

    // ---- response construction ---------------------------------------------

    /// Appends a header to the outgoing response.
    ///
    /// Multiple values for the same name are all kept; the dispatcher
    /// merges them into the final response, with the response's own
    /// headers taking precedence on conflicts.
    pub fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.append(name, value);
    }

    /// Queues a `Set-Cookie` value for the outgoing response.
    pub fn set_cookie(&mut self, cookie: impl Into<String>) {
        self.response_cookies.push(cookie.into());
    }

    /// Returns the headers accumulated for the outgoing response.
    #[must_use]
    pub const fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Returns the `Set-Cookie` values accumulated for the outgoing response.
    #[must_use]
    pub fn response_cookies(&self) -> &[String] {
        &self.response_cookies
    }

    /// Returns true if a response-producing helper has run.
    #[must_use]
    pub const fn responded(&self) -> bool {
        self.responded
    }

    /// Builds a `text/plain` response and marks the context as responded.
    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) -> Response {
        self.responded = true;
        Response::text(status, body)
    }

    /// Builds an `application/json` response and marks the context as
    /// responded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseEncoding`] when serialization fails.
    pub fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) -> Result<Response, Error> {
        let resp = Response::json(status, value)?;
        self.responded = true;
        Ok(resp)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("params", &self.params)
            .field("responded", &self.responded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(method: Method, uri: &str) -> RequestContext {
        let mut ctx = RequestContext::new();
        ctx.fill(method, uri.parse().unwrap(), None, None);
        ctx
    }

    #[test]
    fn test_request_id_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_request_id_display() {
        let display = RequestId::new().to_string();
        assert_eq!(display.len(), 36);
        assert!(display.contains('-'));
    }

    #[test]
    fn test_fill_parses_query() {
        let ctx = filled(Method::GET, "/search?q=rust&tag=web&tag=http");

        assert_eq!(ctx.query_value("q"), Some("rust"));
        assert_eq!(ctx.query_all("tag"), vec!["web", "http"]);
        assert_eq!(ctx.query_value("missing"), None);
    }

    #[test]
    fn test_fill_decodes_query_values() {
        let ctx = filled(Method::GET, "/search?q=hello%20world&lang=en+us");
        assert_eq!(ctx.query_value("q"), Some("hello world"));
        assert_eq!(ctx.query_value("lang"), Some("en us"));
    }

    #[test]
    fn test_typed_state() {
        #[derive(Debug, PartialEq)]
        struct Counter(u32);

        let mut ctx = RequestContext::new();
        assert!(!ctx.has::<Counter>());

        ctx.set(Counter(1));
        assert_eq!(ctx.get::<Counter>(), Some(&Counter(1)));

        ctx.get_mut::<Counter>().unwrap().0 += 1;
        assert_eq!(ctx.remove::<Counter>(), Some(Counter(2)));
        assert!(!ctx.has::<Counter>());
    }

    #[test]
    fn test_cookie_parsing() {
        let mut ctx = RequestContext::new();
        ctx.fill(
            Method::GET,
            "/".parse().unwrap(),
            Some("session=abc123; theme=dark%20mode".to_string()),
            None,
        );

        assert_eq!(ctx.cookie("session").unwrap(), Some("abc123"));
        assert_eq!(ctx.cookie("theme").unwrap(), Some("dark mode"));
        assert_eq!(ctx.cookie("missing").unwrap(), None);
    }

    #[test]
    fn test_malformed_cookie_is_an_error() {
        let mut ctx = RequestContext::new();
        ctx.fill(
            Method::GET,
            "/".parse().unwrap(),
            Some("not-a-pair".to_string()),
            None,
        );

        assert!(matches!(ctx.cookies(), Err(Error::InvalidCookie { .. })));
    }

    #[test]
    fn test_no_cookie_header_yields_empty_map() {
        let mut ctx = RequestContext::new();
        assert!(ctx.cookies().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_body_consumes_source_once() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_body = Arc::clone(&calls);

        let mut ctx = RequestContext::new();
        ctx.fill(
            Method::POST,
            "/upload".parse().unwrap(),
            None,
            Some(Box::pin(async move {
                calls_in_body.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from_static(b"payload"))
            })),
        );

        assert_eq!(ctx.read_body().await.unwrap(), "payload");
        assert_eq!(ctx.read_body().await.unwrap(), "payload");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_body_json() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Payload {
            name: String,
        }

        let mut ctx = RequestContext::new();
        ctx.fill(
            Method::POST,
            "/users".parse().unwrap(),
            None,
            Some(Box::pin(async { Ok(Bytes::from_static(b"{\"name\":\"ada\"}")) })),
        );

        let payload: Payload = ctx.body_json().await.unwrap();
        assert_eq!(payload.name, "ada");
    }

    #[tokio::test]
    async fn test_body_json_invalid() {
        let mut ctx = RequestContext::new();
        ctx.fill(
            Method::POST,
            "/users".parse().unwrap(),
            None,
            Some(Box::pin(async { Ok(Bytes::from_static(b"not json")) })),
        );

        let result: Result<serde_json::Value, _> = ctx.body_json().await;
        assert!(matches!(result, Err(Error::InvalidJson(_))));
    }

    #[tokio::test]
    async fn test_missing_body_source_reads_empty() {
        let mut ctx = RequestContext::new();
        assert!(ctx.read_body().await.unwrap().is_empty());
    }

    #[test]
    fn test_response_helpers_mark_responded() {
        let mut ctx = RequestContext::new();
        assert!(!ctx.responded());

        let resp = ctx.text(StatusCode::OK, "done");
        assert!(ctx.responded());
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = RequestContext::new();
        ctx.fill(
            Method::POST,
            "/users?a=1".parse().unwrap(),
            Some("s=1".to_string()),
            None,
        );
        ctx.set(42u32);
        let mut params = Params::new();
        params.push("id", "7");
        ctx.set_params(params);
        ctx.add_header(
            HeaderName::from_static("x-test"),
            HeaderValue::from_static("1"),
        );
        ctx.set_cookie("a=b");
        let _ = ctx.text(StatusCode::OK, "done");
        let old_id = ctx.request_id();

        ctx.reset();

        assert_ne!(ctx.request_id(), old_id);
        assert_eq!(ctx.method(), &Method::GET);
        assert_eq!(ctx.path(), "/");
        assert!(ctx.params().is_empty());
        assert!(ctx.query().is_empty());
        assert!(!ctx.has::<u32>());
        assert!(ctx.response_headers().is_empty());
        assert!(ctx.response_cookies().is_empty());
        assert!(!ctx.responded());
        assert!(ctx.cookies().unwrap().is_empty());
    }
}
