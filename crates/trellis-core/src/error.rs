//! Request-time error types.
//!
//! This module provides the [`Error`] type raised by handlers, middleware
//! and the context accessors, plus the serializable envelope the dispatcher
//! renders when an error escapes the pipeline. Errors never crash the
//! process: the dispatcher catches them centrally and maps each to an HTTP
//! status via [`Error::status_code`].

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Standard request-time error for trellis.
///
/// # Example
///
/// ```
/// use trellis_core::Error;
/// use http::StatusCode;
///
/// fn authorize(token: Option<&str>) -> Result<(), Error> {
///     match token {
///         Some(_) => Ok(()),
///         None => Err(Error::response(StatusCode::UNAUTHORIZED, "missing token")),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The request body could not be read from the transport.
    #[error("failed to read request body: {message}")]
    BodyRead {
        /// Human-readable error message.
        message: String,
    },

    /// The request body was read but is not the JSON the handler expected.
    #[error("invalid JSON in request body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The `Cookie` header could not be decoded.
    #[error("invalid cookie header: {message}")]
    InvalidCookie {
        /// Human-readable error message.
        message: String,
    },

    /// A response body failed to serialize.
    #[error("failed to encode response body: {0}")]
    ResponseEncoding(#[source] serde_json::Error),

    /// A status-bearing failure raised deliberately by a handler.
    #[error("{message}")]
    Response {
        /// The HTTP status to render.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },

    /// Any other handler failure. Rendered as a 500 without leaking detail.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Creates a body-read error.
    #[must_use]
    pub fn body_read(message: impl Into<String>) -> Self {
        Self::BodyRead {
            message: message.into(),
        }
    }

    /// Creates an invalid-cookie error.
    #[must_use]
    pub fn invalid_cookie(message: impl Into<String>) -> Self {
        Self::InvalidCookie {
            message: message.into(),
        }
    }

    /// Creates a status-bearing error with a message.
    #[must_use]
    pub fn response(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Response {
            status,
            message: message.into(),
        }
    }

    /// Creates an internal (500) error with a message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Response {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Returns the HTTP status code this error renders as.
    ///
    /// Request-parse failures map to 400; everything without an explicit
    /// status maps to 500.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BodyRead { .. } | Self::InvalidJson(_) | Self::InvalidCookie { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Response { status, .. } => *status,
            Self::ResponseEncoding(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a machine-readable error code for the envelope.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BodyRead { .. } => "BODY_READ_ERROR",
            Self::InvalidJson(_) => "INVALID_JSON",
            Self::InvalidCookie { .. } => "INVALID_COOKIE",
            Self::ResponseEncoding(_) => "RESPONSE_ENCODING_ERROR",
            Self::Response { status, .. } => {
                if status.is_client_error() {
                    "REQUEST_ERROR"
                } else {
                    "INTERNAL_ERROR"
                }
            }
            Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Converts this error to a serializable error envelope.
    ///
    /// Internal failures are masked: the envelope carries only the error
    /// code and a generic message, never the source chain.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        let message = match self {
            Self::ResponseEncoding(_) | Self::Other(_) => "internal server error".to_string(),
            _ => self.to_string(),
        };
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
            request_id: request_id.map(ToString::to_string),
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}
