//! Session context shared by every request of a run.

use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use super::constants::{
    CALENDAR_API_ROOT, DEFAULT_BASE_URI, DEFAULT_JITTER_UNIT, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_WEB_ROOT, SUSPICIOUS_SIZE_BAND,
};

/// A session cookie supplied by the caller.
///
/// The value is redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    value: String,
}

impl SessionCookie {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Cookie values are credentials; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Everything the client needs to talk to one group. Immutable once built.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use archiver_core::api::{Session, SessionCookie};
///
/// let session = Session::new("mygroup")
///     .with_cookie(SessionCookie::new("T", "t-cookie"))
///     .with_min_delay(Duration::from_millis(200))
///     .with_max_retries(5);
/// assert_eq!(session.group(), "mygroup");
/// assert_eq!(session.max_retries(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    group: String,
    base_uri: String,
    web_root: String,
    calendar_root: String,
    cookies: Vec<SessionCookie>,
    headers: Vec<(String, String)>,
    min_delay: Duration,
    max_retries: u32,
    request_timeout: Duration,
    jitter_unit: Duration,
    suspicious_band: RangeInclusive<usize>,
    ca_bundle: Option<PathBuf>,
    rng_seed: Option<u64>,
}

impl Session {
    #[must_use]
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            base_uri: DEFAULT_BASE_URI.to_string(),
            web_root: DEFAULT_WEB_ROOT.to_string(),
            calendar_root: CALENDAR_API_ROOT.to_string(),
            cookies: Vec::new(),
            headers: Vec::new(),
            min_delay: Duration::ZERO,
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            jitter_unit: DEFAULT_JITTER_UNIT,
            suspicious_band: SUSPICIOUS_SIZE_BAND,
            ca_bundle: None,
            rng_seed: None,
        }
    }

    /// Overrides the API root (tests point this at a mock server).
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the web root used for non-API downloads such as CSV exports.
    #[must_use]
    pub fn with_web_root(mut self, web_root: impl Into<String>) -> Self {
        self.web_root = web_root.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the calendar API root.
    #[must_use]
    pub fn with_calendar_root(mut self, calendar_root: impl Into<String>) -> Self {
        self.calendar_root = calendar_root.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: SessionCookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    /// Sets the attempt cap (clamped to at least 1).
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_jitter_unit(mut self, unit: Duration) -> Self {
        self.jitter_unit = unit;
        self
    }

    #[must_use]
    pub fn with_suspicious_band(mut self, band: RangeInclusive<usize>) -> Self {
        self.suspicious_band = band;
        self
    }

    /// Pins TLS verification to the certificates in a PEM bundle.
    #[must_use]
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Seeds the backoff jitter for reproducible runs.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    #[must_use]
    pub fn web_root(&self) -> &str {
        &self.web_root
    }

    #[must_use]
    pub fn calendar_root(&self) -> &str {
        &self.calendar_root
    }

    #[must_use]
    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn jitter_unit(&self) -> Duration {
        self.jitter_unit
    }

    #[must_use]
    pub fn suspicious_band(&self) -> &RangeInclusive<usize> {
        &self.suspicious_band
    }

    #[must_use]
    pub fn ca_bundle(&self) -> Option<&PathBuf> {
        self.ca_bundle.as_ref()
    }

    #[must_use]
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let session = Session::new("g");
        assert_eq!(session.base_uri(), DEFAULT_BASE_URI);
        assert_eq!(session.max_retries(), 10);
        assert_eq!(session.min_delay(), Duration::ZERO);
        assert_eq!(session.request_timeout(), Duration::from_secs(15));
        assert_eq!(session.suspicious_band(), &(60..=68));
        assert!(session.ca_bundle().is_none());
    }

    #[test]
    fn test_max_retries_clamped_to_one() {
        assert_eq!(Session::new("g").with_max_retries(0).max_retries(), 1);
    }

    #[test]
    fn test_base_uri_trailing_slash_trimmed() {
        let session = Session::new("g").with_base_uri("http://127.0.0.1:8080/api/");
        assert_eq!(session.base_uri(), "http://127.0.0.1:8080/api");
    }

    #[test]
    fn test_cookie_value_redacted_in_debug() {
        let session = Session::new("g").with_cookie(SessionCookie::new("T", "secret-token"));
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-token"), "cookie leaked: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}
