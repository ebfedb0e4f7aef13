//! Error types for the API client.
//!
//! Every failure the client can observe is mapped onto one [`ApiError`]
//! variant carrying the URI (and status, where there is one) so callers can
//! decide whether to retry, downgrade, skip, or abort.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the transport, the classifier, and the resource client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Endpoint name not present in the endpoint table.
    #[error("unknown API endpoint '{name}'")]
    UnknownEndpoint {
        /// The name that was requested.
        name: String,
    },

    /// HTTP 307: the session is not logged in.
    #[error("not authenticated (HTTP 307) requesting {uri}")]
    NotAuthenticated {
        /// Target URI.
        uri: String,
    },

    /// HTTP 401/403: the session lacks permission for this resource.
    #[error("unauthorized (HTTP {status}) requesting {uri}")]
    Unauthorized {
        /// Target URI.
        uri: String,
        /// 401 or 403.
        status: u16,
    },

    /// HTTP 404.
    #[error("not found requesting {uri}")]
    NotFound {
        /// Target URI.
        uri: String,
    },

    /// Body length inside the placeholder band; never trusted as content.
    #[error("suspicious response size {len} bytes (HTTP {status}) from {uri}")]
    SuspiciousSize {
        /// Target URI.
        uri: String,
        /// Status the placeholder arrived with.
        status: u16,
        /// Body length in bytes.
        len: usize,
    },

    /// Any other non-200 status.
    #[error("HTTP {status} requesting {uri}")]
    Recoverable {
        /// Target URI.
        uri: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Request timed out.
    #[error("timeout requesting {uri}")]
    Timeout {
        /// Target URI.
        uri: String,
    },

    /// Connection-level failure (DNS, reset, TLS).
    #[error("network error requesting {uri}: {source}")]
    Network {
        /// Target URI.
        uri: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A 200 body that is not valid JSON (usually a truncated response).
    #[error("invalid JSON from {uri}: {source}")]
    Decode {
        /// Target URI.
        uri: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A 200 JSON body without the data payload.
    #[error("malformed envelope from {uri}: {reason}")]
    MalformedEnvelope {
        /// Target URI.
        uri: String,
        /// What was missing.
        reason: String,
    },

    /// Recoverable failures persisted past the attempt cap.
    #[error("giving up on {uri} after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Target URI.
        uri: String,
        /// Attempts made.
        attempts: u32,
        /// The last classified failure.
        #[source]
        last: Box<ApiError>,
    },

    /// URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },

    /// Writing a downloaded body to its sink failed.
    #[error("IO error writing download of {uri}: {source}")]
    Sink {
        /// Source URI of the body.
        uri: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The pinned CA bundle could not be loaded.
    #[error("cannot load CA bundle {path}: {reason}")]
    CaBundle {
        /// Bundle path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A custom header name or value is not valid HTTP.
    #[error("invalid header '{name}'")]
    InvalidHeader {
        /// Header name as supplied.
        name: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// Builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn unknown_endpoint(name: impl Into<String>) -> Self {
        Self::UnknownEndpoint { name: name.into() }
    }

    pub fn network(uri: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            uri: uri.into(),
            source,
        }
    }

    pub fn timeout(uri: impl Into<String>) -> Self {
        Self::Timeout { uri: uri.into() }
    }

    pub fn recoverable(uri: impl Into<String>, status: u16) -> Self {
        Self::Recoverable {
            uri: uri.into(),
            status,
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    pub fn malformed(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// True for the permission/auth/not-found kinds, including when they are
    /// the last error behind an exhausted retry loop.
    #[must_use]
    pub fn is_inaccessible(&self) -> bool {
        match self {
            Self::NotAuthenticated { .. } | Self::Unauthorized { .. } | Self::NotFound { .. } => {
                true
            }
            Self::RetriesExhausted { last, .. } => last.is_inaccessible(),
            _ => false,
        }
    }

    /// The URI the failure is about, including its query string.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::NotAuthenticated { uri }
            | Self::Unauthorized { uri, .. }
            | Self::NotFound { uri }
            | Self::SuspiciousSize { uri, .. }
            | Self::Recoverable { uri, .. }
            | Self::Timeout { uri }
            | Self::Network { uri, .. }
            | Self::Decode { uri, .. }
            | Self::MalformedEnvelope { uri, .. }
            | Self::RetriesExhausted { uri, .. }
            | Self::Sink { uri, .. } => Some(uri.as_str()),
            Self::InvalidUrl { url } => Some(url.as_str()),
            Self::UnknownEndpoint { .. }
            | Self::CaBundle { .. }
            | Self::InvalidHeader { .. }
            | Self::ClientBuild { .. } => None,
        }
    }

    /// HTTP status associated with the failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotAuthenticated { .. } => Some(307),
            Self::NotFound { .. } => Some(404),
            Self::Unauthorized { status, .. }
            | Self::SuspiciousSize { status, .. }
            | Self::Recoverable { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_display_contains_status_and_uri() {
        let error = ApiError::Unauthorized {
            uri: "https://example.com/api/v1/groups/g/messages".to_string(),
            status: 403,
        };
        let msg = error.to_string();
        assert!(msg.contains("403"), "Expected status in: {msg}");
        assert!(msg.contains("/groups/g/messages"), "Expected URI in: {msg}");
    }

    #[test]
    fn test_exhausted_display_includes_last_error() {
        let error = ApiError::RetriesExhausted {
            uri: "https://example.com/x".to_string(),
            attempts: 10,
            last: Box::new(ApiError::recoverable("https://example.com/x", 500)),
        };
        let msg = error.to_string();
        assert!(msg.contains("10 attempts"), "{msg}");
        assert!(msg.contains("HTTP 500"), "{msg}");
        assert_eq!(error.status(), Some(500));
    }

    #[test]
    fn test_is_inaccessible_kinds() {
        assert!(ApiError::NotAuthenticated { uri: "u".into() }.is_inaccessible());
        assert!(
            ApiError::Unauthorized {
                uri: "u".into(),
                status: 401
            }
            .is_inaccessible()
        );
        assert!(ApiError::NotFound { uri: "u".into() }.is_inaccessible());
        assert!(!ApiError::recoverable("u", 500).is_inaccessible());
        assert!(!ApiError::timeout("u").is_inaccessible());
    }

    #[test]
    fn test_uri_reported_for_request_failures_only() {
        let exhausted = ApiError::RetriesExhausted {
            uri: "https://example.com/api?count=1".to_string(),
            attempts: 2,
            last: Box::new(ApiError::recoverable("https://example.com/api?count=1", 502)),
        };
        assert_eq!(exhausted.uri(), Some("https://example.com/api?count=1"));
        assert_eq!(ApiError::invalid_url("not a url").uri(), Some("not a url"));
        assert_eq!(ApiError::unknown_endpoint("bogus").uri(), None);
    }
}
