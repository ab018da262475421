//! Transport-neutral HTTP responses.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde::Serialize;

use crate::error::Error;

/// A fully materialized HTTP response.
///
/// `Response` is transport-neutral: it holds a status, a header map and a
/// `Bytes` body, and the server adapter converts it into whatever the
/// transport needs. Bodies are buffered, not streamed.
///
/// # Example
///
/// ```
/// use trellis_core::Response;
/// use http::StatusCode;
///
/// let resp = Response::text(StatusCode::OK, "hello")
///     .with_header("x-served-by", "trellis");
///
/// assert_eq!(resp.status(), StatusCode::OK);
/// assert_eq!(resp.body(), "hello".as_bytes());
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    status: StatusCode,
    /// Outbound headers.
    headers: HeaderMap,
    /// Buffered body.
    body: Bytes,
}

impl Response {
    /// Creates a response with the given status and raw body.
    #[must_use]
    pub fn new(status: StatusCode, body: Bytes) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Creates an empty response with the given status.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Bytes::new())
    }

    /// Creates a `text/plain` response.
    #[must_use]
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut resp = Self::new(status, Bytes::from(body.into()));
        resp.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        resp
    }

    /// Creates an `application/json` response by serializing `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseEncoding`] when serialization fails.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value).map_err(Error::ResponseEncoding)?;
        let mut resp = Self::new(status, Bytes::from(body));
        resp.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(resp)
    }

    /// Adds a header, replacing any existing value for the name.
    ///
    /// Invalid names or values are silently dropped; use
    /// [`headers_mut`](Self::headers_mut) when that matters.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decomposes the response into its parts.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response() {
        let resp = Response::text(StatusCode::OK, "hello");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body(), "hello".as_bytes());
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_json_response() {
        let resp = Response::json(StatusCode::CREATED, &serde_json::json!({"id": 7})).unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(resp.body(), br#"{"id":7}"#.as_slice());
    }

    #[test]
    fn test_empty_response() {
        let resp = Response::empty(StatusCode::NO_CONTENT);
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp.body().is_empty());
        assert!(resp.headers().is_empty());
    }

    #[test]
    fn test_with_header() {
        let resp = Response::empty(StatusCode::OK)
            .with_header("x-request-id", "abc")
            .with_header("x-request-id", "def");
        assert_eq!(resp.headers().get("x-request-id").unwrap(), "def");
    }
}
