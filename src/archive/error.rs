//! Error types for the traversal engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

/// Errors raised while walking a resource family and persisting its artifacts.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The resource client failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Writing an artifact or creating a directory failed.
    #[error("IO error at {path}: {source}")]
    Store {
        /// Path relative to the archive root.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing a JSON artifact failed.
    #[error("cannot encode {path}: {source}")]
    Encode {
        /// Path relative to the archive root.
        path: PathBuf,
        /// Serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// A payload did not have the shape the traversal needs.
    #[error("unexpected payload shape for {context}: {source}")]
    Shape {
        /// What was being read (endpoint and item).
        context: String,
        /// Deserializer error.
        #[source]
        source: serde_json::Error,
    },

    /// A response that is well-formed but not what the protocol step expects.
    #[error("unexpected response from {uri}: {reason}")]
    UnexpectedResponse {
        /// Target URI.
        uri: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A required field was absent from a payload.
    #[error("missing '{field}' in {context}")]
    MissingField {
        /// Field name as sent by the service.
        field: &'static str,
        /// What was being read.
        context: String,
    },
}

impl ArchiveError {
    pub fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Store {
            path: path.into(),
            source,
        }
    }

    pub fn shape(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Shape {
            context: context.into(),
            source,
        }
    }

    pub fn unexpected(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: &'static str, context: impl Into<String>) -> Self {
        Self::MissingField {
            field,
            context: context.into(),
        }
    }

    /// The URI involved, when the failure came from the resource client.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::Api(api) => api.uri(),
            Self::UnexpectedResponse { uri, .. } => Some(uri.as_str()),
            _ => None,
        }
    }

    /// True when the resource is closed to this session (auth or not found).
    #[must_use]
    pub fn is_inaccessible(&self) -> bool {
        matches!(self, Self::Api(api) if api.is_inaccessible())
    }
}
