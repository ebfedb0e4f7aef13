//! Classification of completed HTTP exchanges into typed errors.
//!
//! The service signals most failures through status codes that do not mean
//! what they normally would (a 307 is a login wall, a 200 may carry a
//! placeholder body), so every response passes through
//! [`classify_response`] before its body is trusted.

use std::ops::RangeInclusive;

use tracing::instrument;

use super::constants::MALWARE_MARKER;
use super::error::ApiError;

/// Whether a failure can be resolved by repeating the identical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Plausibly transient; eligible for retry under backoff.
    Recoverable,

    /// Retrying cannot succeed (auth, permission, not found, bad input).
    Unrecoverable,
}

/// Maps a completed exchange to `Ok(())` or the matching error kind.
///
/// | Condition | Result |
/// |-----------|--------|
/// | 307 | `NotAuthenticated` |
/// | 401, 403 | `Unauthorized` |
/// | 404 | `NotFound` |
/// | body length in `band` | `SuspiciousSize` |
/// | other non-200 | `Recoverable` |
///
/// Rules are applied in that order, so a 404 with a 64-byte body is still
/// `NotFound`, while a 200 with a 64-byte body is `SuspiciousSize`.
pub fn classify_response(
    uri: &str,
    status: u16,
    body_len: usize,
    band: &RangeInclusive<usize>,
) -> Result<(), ApiError> {
    match status {
        307 => Err(ApiError::NotAuthenticated {
            uri: uri.to_string(),
        }),
        401 | 403 => Err(ApiError::Unauthorized {
            uri: uri.to_string(),
            status,
        }),
        404 => Err(ApiError::NotFound {
            uri: uri.to_string(),
        }),
        _ if band.contains(&body_len) => Err(ApiError::SuspiciousSize {
            uri: uri.to_string(),
            status,
            len: body_len,
        }),
        200 => Ok(()),
        _ => Err(ApiError::recoverable(uri, status)),
    }
}

/// True when a download response is the origin refusing a flagged file.
#[must_use]
pub fn is_rejected_by_origin(status: u16, body: &[u8]) -> bool {
    status == 400 && String::from_utf8_lossy(body).contains(MALWARE_MARKER)
}

/// Classifies an error for retry decisions.
#[instrument(level = "trace")]
pub fn classify_error(error: &ApiError) -> FailureType {
    match error {
        ApiError::SuspiciousSize { .. }
        | ApiError::Recoverable { .. }
        | ApiError::Timeout { .. }
        | ApiError::Network { .. }
        | ApiError::Decode { .. } => FailureType::Recoverable,

        ApiError::UnknownEndpoint { .. }
        | ApiError::NotAuthenticated { .. }
        | ApiError::Unauthorized { .. }
        | ApiError::NotFound { .. }
        | ApiError::MalformedEnvelope { .. }
        | ApiError::RetriesExhausted { .. }
        | ApiError::InvalidUrl { .. }
        | ApiError::Sink { .. }
        | ApiError::CaBundle { .. }
        | ApiError::InvalidHeader { .. }
        | ApiError::ClientBuild { .. } => FailureType::Unrecoverable,
    }
}
