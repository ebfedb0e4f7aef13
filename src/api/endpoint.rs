//! The table of API endpoints and the URI scheme built on top of it.

use std::fmt;
use std::str::FromStr;

use super::error::ApiError;

/// API version an endpoint is served under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

/// Every resource endpoint the client is allowed to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The group root; has no path segment of its own.
    GroupInfo,
    Messages,
    Files,
    /// v3 exists but moves photo URLs around inside the JSON.
    Albums,
    Database,
    Links,
    Statistics,
    Polls,
    Attachments,
    Members,
}

impl Endpoint {
    pub const ALL: [Self; 10] = [
        Self::GroupInfo,
        Self::Messages,
        Self::Files,
        Self::Albums,
        Self::Database,
        Self::Links,
        Self::Statistics,
        Self::Polls,
        Self::Attachments,
        Self::Members,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GroupInfo => "groupinfo",
            Self::Messages => "messages",
            Self::Files => "files",
            Self::Albums => "albums",
            Self::Database => "database",
            Self::Links => "links",
            Self::Statistics => "statistics",
            Self::Polls => "polls",
            Self::Attachments => "attachments",
            Self::Members => "members",
        }
    }

    #[must_use]
    pub const fn version(self) -> ApiVersion {
        match self {
            Self::Files | Self::Albums => ApiVersion::V2,
            _ => ApiVersion::V1,
        }
    }

    /// Looks up an endpoint by name, failing closed on anything not in the table.
    pub fn from_name(name: &str) -> Result<Self, ApiError> {
        Self::ALL
            .into_iter()
            .find(|endpoint| endpoint.name() == name)
            .ok_or_else(|| ApiError::unknown_endpoint(name))
    }

    /// Builds `{base}/{version}/groups/{group}/{name}/{parts...}`.
    ///
    /// The group-info endpoint resolves to `{base}/v1/groups/{group}/`.
    #[must_use]
    pub fn uri(self, base: &str, group: &str, parts: &[&str]) -> String {
        let base = base.trim_end_matches('/');
        let segment = match self {
            Self::GroupInfo => "",
            other => other.name(),
        };
        let mut uri = format!("{base}/{}/groups/{group}/{segment}", self.version().as_str());
        for part in parts {
            uri.push('/');
            uri.push_str(part);
        }
        uri
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Endpoint {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BASE: &str = "https://groups.example.com/api";

    #[test]
    fn test_files_uses_v2_with_parts() {
        let uri = Endpoint::Files.uri(BASE, "groupname", &["a", "2"]);
        assert_eq!(uri, "https://groups.example.com/api/v2/groups/groupname/files/a/2");
    }

    #[test]
    fn test_messages_raw_uri() {
        let uri = Endpoint::Messages.uri(BASE, "g", &["123", "raw"]);
        assert_eq!(uri, "https://groups.example.com/api/v1/groups/g/messages/123/raw");
    }

    #[test]
    fn test_group_info_resolves_to_group_root() {
        let uri = Endpoint::GroupInfo.uri(BASE, "test", &[]);
        assert_eq!(uri, "https://groups.example.com/api/v1/groups/test/");
    }

    #[test]
    fn test_base_trailing_slash_ignored() {
        let uri = Endpoint::Polls.uri("https://groups.example.com/api/", "g", &[]);
        assert_eq!(uri, "https://groups.example.com/api/v1/groups/g/polls");
    }

    #[test]
    fn test_from_name_known_endpoints_round_trip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_name(endpoint.name()).unwrap(), endpoint);
        }
    }

    #[test]
    fn test_from_name_unknown_fails_closed() {
        match Endpoint::from_name("calendar") {
            Err(ApiError::UnknownEndpoint { name }) => assert_eq!(name, "calendar"),
            other => panic!("Expected UnknownEndpoint, got {other:?}"),
        }
    }

    #[test]
    fn test_albums_version_is_v2() {
        assert_eq!(Endpoint::Albums.version(), ApiVersion::V2);
        assert_eq!(Endpoint::Members.version(), ApiVersion::V1);
    }
}
