//! Registration-time routing errors.
//!
//! Every variant here is a configuration error: it is raised synchronously
//! while routes are being registered, before the server accepts traffic.
//! Lookup never produces an error; an unmatched path is simply `None`.

use thiserror::Error;

/// Errors raised while registering a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern does not begin with `/`.
    #[error("route pattern must start with '/': {pattern:?}")]
    MissingLeadingSlash {
        /// The offending pattern.
        pattern: String,
    },

    /// The method is an extension method the router has no slot for.
    ///
    /// Only the nine standard HTTP methods can be routed; anything else
    /// would be silently unreachable, so it is rejected up front.
    #[error("unsupported HTTP method {method} registering {pattern:?}")]
    UnsupportedMethod {
        /// The offending pattern.
        pattern: String,
        /// The extension method as received.
        method: String,
    },

    /// A `:` segment with no name following it.
    #[error("empty parameter name in pattern {pattern:?}")]
    EmptyParamName {
        /// The offending pattern.
        pattern: String,
    },

    /// A `*` segment with no name following it.
    #[error("empty wildcard name in pattern {pattern:?}")]
    EmptyWildcardName {
        /// The offending pattern.
        pattern: String,
    },

    /// A wildcard segment that is not the final segment of the pattern.
    ///
    /// A wildcard consumes the remainder of the path, so nothing may be
    /// registered underneath it.
    #[error("wildcard must be the final segment in pattern {pattern:?}")]
    WildcardNotTerminal {
        /// The offending pattern.
        pattern: String,
    },

    /// Two patterns bind differently-named parameters at the same position.
    ///
    /// A node holds at most one parameter child, so `/users/:id` and
    /// `/users/:userId` cannot coexist.
    #[error(
        "conflicting parameter names at the same position: ':{existing}' is already \
         registered, pattern {pattern:?} binds ':{conflicting}'"
    )]
    ParamNameConflict {
        /// The offending pattern.
        pattern: String,
        /// The parameter name already registered at this position.
        existing: String,
        /// The parameter name the new pattern tried to bind.
        conflicting: String,
    },

    /// Two patterns bind differently-named wildcards at the same position.
    #[error(
        "conflicting wildcard names at the same position: '*{existing}' is already \
         registered, pattern {pattern:?} binds '*{conflicting}'"
    )]
    WildcardNameConflict {
        /// The offending pattern.
        pattern: String,
        /// The wildcard name already registered at this position.
        existing: String,
        /// The wildcard name the new pattern tried to bind.
        conflicting: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouteError::ParamNameConflict {
            pattern: "/users/:userId".to_string(),
            existing: "id".to_string(),
            conflicting: "userId".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains(":id"));
        assert!(msg.contains(":userId"));
    }

    #[test]
    fn test_error_equality() {
        let a = RouteError::MissingLeadingSlash {
            pattern: "users".to_string(),
        };
        let b = RouteError::MissingLeadingSlash {
            pattern: "users".to_string(),
        };
        assert_eq!(a, b);
    }
}
