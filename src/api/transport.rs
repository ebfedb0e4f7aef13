//! Single-shot HTTP exchanges with session credentials attached.
//!
//! The transport never retries and never interprets status codes; it only
//! moves bytes and hands every completed exchange to the capture scope.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER};
use reqwest::redirect::Policy;
use reqwest::{Certificate, Client, ClientBuilder, Method};
use tracing::{debug, instrument};
use url::Url;

use super::capture::{CaptureScope, CapturedExchange, NoCapture};
use super::constants::CONNECT_TIMEOUT;
use super::error::ApiError;
use super::session::{Session, SessionCookie};
use crate::user_agent;

/// A response as received, before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URI including the query string.
    pub uri: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Thin wrapper over two reqwest clients sharing one cookie jar.
///
/// API calls must not follow redirects (a 307 means "log in"), while asset
/// downloads routinely bounce through CDN redirects.
///
/// Session cookies are host-less: they are registered in the jar for every
/// host the transport is asked to contact, the first time it is contacted.
#[derive(Debug, Clone)]
pub struct Transport {
    api: Client,
    assets: Client,
    jar: Arc<Jar>,
    cookies: Vec<SessionCookie>,
    cookie_hosts: Arc<Mutex<HashSet<String>>>,
    capture: Arc<dyn CaptureScope>,
}

impl Transport {
    /// Builds a transport with capture disabled.
    pub fn new(session: &Session) -> Result<Self, ApiError> {
        Self::with_capture(session, Arc::new(NoCapture))
    }

    /// Builds a transport that reports every exchange to `capture`.
    #[instrument(level = "debug", skip_all, fields(group = session.group()))]
    pub fn with_capture(
        session: &Session,
        capture: Arc<dyn CaptureScope>,
    ) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());
        let headers = default_headers(session)?;
        let certs = match session.ca_bundle() {
            Some(path) => Some(load_ca_bundle(path)?),
            None => None,
        };

        let api = base_client_builder(session, Arc::clone(&jar), headers.clone(), certs.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|source| ApiError::ClientBuild { source })?;
        let assets = base_client_builder(session, Arc::clone(&jar), headers, certs)
            .build()
            .map_err(|source| ApiError::ClientBuild { source })?;

        let transport = Self {
            api,
            assets,
            jar,
            cookies: session.cookies().to_vec(),
            cookie_hosts: Arc::new(Mutex::new(HashSet::new())),
            capture,
        };
        for root in [session.base_uri(), session.web_root(), session.calendar_root()] {
            let url = Url::parse(root).map_err(|_| ApiError::invalid_url(root))?;
            transport.register_cookies(&url);
        }

        debug!(
            cookies = session.cookies().len(),
            pinned_ca = session.ca_bundle().is_some(),
            "transport ready"
        );
        Ok(transport)
    }

    /// Adds the session cookies for `url`'s host unless already present.
    fn register_cookies(&self, url: &Url) {
        let Some(host) = url.host_str() else {
            return;
        };
        let mut hosts = self
            .cookie_hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !hosts.insert(host.to_string()) {
            return;
        }
        for cookie in &self.cookies {
            self.jar
                .add_cookie_str(&format!("{}={}; Path=/", cookie.name, cookie.value()), url);
        }
    }

    /// Performs one request and returns the response unclassified.
    ///
    /// # Errors
    ///
    /// Only connection-level failures: [`ApiError::Timeout`],
    /// [`ApiError::Network`], and [`ApiError::InvalidUrl`].
    #[instrument(level = "debug", skip(self, query), fields(uri = %uri))]
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        query: &[(&str, String)],
        follow_redirects: bool,
    ) -> Result<RawResponse, ApiError> {
        let mut url = Url::parse(uri).map_err(|_| ApiError::invalid_url(uri))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        let full_uri = url.to_string();
        self.register_cookies(&url);

        let client = if follow_redirects {
            &self.assets
        } else {
            &self.api
        };
        let response = client
            .request(method.clone(), url)
            .send()
            .await
            .map_err(|e| transport_error(&full_uri, e))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&full_uri, e))?
            .to_vec();

        debug!(status, bytes = body.len(), "response received");
        self.capture.record(&CapturedExchange {
            method: method.as_str(),
            uri: &full_uri,
            status,
            response_headers: &headers,
            body: &body,
        });

        Ok(RawResponse {
            uri: full_uri,
            status,
            headers,
            body,
        })
    }
}

fn transport_error(uri: &str, error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::timeout(uri)
    } else {
        ApiError::network(uri, error)
    }
}

fn base_client_builder(
    session: &Session,
    jar: Arc<Jar>,
    headers: HeaderMap,
    certs: Option<Vec<Certificate>>,
) -> ClientBuilder {
    // user_agent() first so a custom User-Agent header in `headers` wins.
    let mut builder = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(session.request_timeout())
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .default_headers(headers)
        .cookie_provider(jar);
    if let Some(certs) = certs {
        builder = builder.tls_certs_only(certs);
    }
    builder
}

fn default_headers(session: &Session) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let referer = HeaderValue::from_str(session.base_uri()).map_err(|_| ApiError::InvalidHeader {
        name: REFERER.as_str().to_string(),
    })?;
    headers.insert(REFERER, referer);

    for (name, value) in session.headers() {
        let invalid = || ApiError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

fn load_ca_bundle(path: &Path) -> Result<Vec<Certificate>, ApiError> {
    let bundle_error = |reason: String| ApiError::CaBundle {
        path: path.to_path_buf(),
        reason,
    };
    let pem = std::fs::read(path).map_err(|e| bundle_error(e.to_string()))?;
    let certs = Certificate::from_pem_bundle(&pem).map_err(|e| bundle_error(e.to_string()))?;
    if certs.is_empty() {
        return Err(bundle_error("no certificates in bundle".to_string()));
    }
    Ok(certs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers_include_referer_and_custom() {
        let session = Session::new("g")
            .with_base_uri("https://groups.example.com/api")
            .with_header("User-Agent", "custom-agent/1.0");
        let headers = default_headers(&session).unwrap();
        assert_eq!(headers.get(REFERER).unwrap(), "https://groups.example.com/api");
        assert_eq!(headers.get("user-agent").unwrap(), "custom-agent/1.0");
    }

    #[test]
    fn test_invalid_custom_header_rejected() {
        let session = Session::new("g").with_header("Bad Header", "x");
        match default_headers(&session) {
            Err(ApiError::InvalidHeader { name }) => assert_eq!(name, "Bad Header"),
            other => panic!("Expected InvalidHeader, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_ca_bundle_is_reported() {
        let session = Session::new("g").with_ca_bundle("/nonexistent/chain.pem");
        match Transport::new(&session) {
            Err(ApiError::CaBundle { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/chain.pem"));
            }
            other => panic!("Expected CaBundle error, got {other:?}"),
        }
    }

    const TEST_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBjTCCATOgAwIBAgIUfJGcKyKfavFNazc6udsSHBJQsp0wCgYIKoZIzj0EAwIw
GzEZMBcGA1UEAwwQYXJjaGl2ZXItdGVzdC1jYTAgFw0yNjEwMTkxMDU2MDJaGA8y
MTI2MDkyNTEwNTYwMlowGzEZMBcGA1UEAwwQYXJjaGl2ZXItdGVzdC1jYTBZMBMG
ByqGSM49AgEGCCqGSM49AwEHA0IABDohaik/6n2+RMulShkHUHxiL3Vx8GvAYHc/
u9JxDe0WYkQLHje9djezMkCE8R7g4tnwiNeV0pJ/15nHVpJDL6CjUzBRMB0GA1Ud
DgQWBBRcp0KfMhv8dQ5Ty7+pqBQT3tLbTDAfBgNVHSMEGDAWgBRcp0KfMhv8dQ5T
y7+pqBQT3tLbTDAPBgNVHRMBAf8EBTADAQH/MAoGCCqGSM49BAMCA0gAMEUCIQCZ
5GQ+md0x6wWKxPN73LmTVq51n2gdRhA4uCYBeLYZSAIgfvSTX2WCjV0IEFuwfO1F
jAvfLriMX+734jG+8AJ2HWs=
-----END CERTIFICATE-----
";

    #[test]
    fn test_pinned_ca_bundle_builds_transport() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chain.pem");
        std::fs::write(&path, TEST_CA_PEM).unwrap();
        assert_eq!(load_ca_bundle(&path).unwrap().len(), 1);

        let session = Session::new("g").with_ca_bundle(&path);
        assert!(Transport::new(&session).is_ok());
    }

    #[test]
    fn test_empty_ca_bundle_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty.pem");
        std::fs::write(&path, b"").unwrap();
        let session = Session::new("g").with_ca_bundle(&path);
        assert!(matches!(
            Transport::new(&session),
            Err(ApiError::CaBundle { .. })
        ));
    }
}
