//! Default User-Agent string for API and asset requests.
//!
//! A session-supplied `User-Agent` header overrides this value.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/group-archiver";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("group-archiver/{version} (archival-tool; +{PROJECT_UA_URL})")
}
