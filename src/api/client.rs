//! Resource client: endpoint dispatch, retry loop, envelope unwrapping.
//!
//! All calls are strictly sequential. Each call sleeps the session's minimum
//! delay once before its first attempt; every retry sleeps a jittered
//! backoff that is itself never shorter than that minimum delay.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use super::capture::{CaptureScope, NoCapture};
use super::classify::{FailureType, classify_error, classify_response, is_rejected_by_origin};
use super::endpoint::Endpoint;
use super::envelope::Envelope;
use super::error::ApiError;
use super::retry::{BackoffPolicy, RetryDecision};
use super::session::Session;
use super::transport::{RawResponse, Transport};

/// Result of a binary download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Body written to the sink; carries the byte count.
    Written(u64),
    /// The origin refused to serve the file (malware flag). Not an error.
    RejectedByOrigin,
}

/// Buffered body of a binary download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Body(Vec<u8>),
    RejectedByOrigin,
}

/// What a single attempt is expected to yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Envelope,
    Asset,
}

enum Attempted {
    Data(Value),
    Body(Vec<u8>),
    Rejected,
}

/// Client for one group's API, shared read-only by every traversal.
#[derive(Debug)]
pub struct GroupsClient {
    session: Session,
    transport: Transport,
    policy: BackoffPolicy,
}

impl GroupsClient {
    /// Builds a client with capture disabled.
    pub fn new(session: Session) -> Result<Self, ApiError> {
        Self::with_capture(session, Arc::new(NoCapture))
    }

    /// Builds a client whose every exchange passes through `capture`.
    pub fn with_capture(
        session: Session,
        capture: Arc<dyn CaptureScope>,
    ) -> Result<Self, ApiError> {
        let transport = Transport::with_capture(&session, capture)?;
        let policy = match session.rng_seed() {
            Some(seed) => BackoffPolicy::with_seed(
                session.max_retries(),
                session.min_delay(),
                session.jitter_unit(),
                seed,
            ),
            None => BackoffPolicy::new(
                session.max_retries(),
                session.min_delay(),
                session.jitter_unit(),
            ),
        };
        Ok(Self {
            session,
            transport,
            policy,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn group(&self) -> &str {
        self.session.group()
    }

    /// Builds the URI for an endpoint of this client's group.
    #[must_use]
    pub fn endpoint_uri(&self, endpoint: Endpoint, parts: &[&str]) -> String {
        endpoint.uri(self.session.base_uri(), self.session.group(), parts)
    }

    /// Fetches an endpoint and returns the envelope's data payload.
    ///
    /// ```no_run
    /// # use archiver_core::api::{Endpoint, GroupsClient, Session};
    /// # async fn example() -> Result<(), archiver_core::api::ApiError> {
    /// let client = GroupsClient::new(Session::new("mygroup"))?;
    /// // GET .../v1/groups/mygroup/messages/123/raw
    /// let raw = client.get_json(Endpoint::Messages, &["123", "raw"], &[]).await?;
    /// // GET .../v1/groups/mygroup/messages?count=50
    /// let page = client
    ///     .get_json(Endpoint::Messages, &[], &[("count", "50".to_string())])
    ///     .await?;
    /// # let _ = (raw, page);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Unrecoverable kinds are returned after the first attempt; recoverable
    /// kinds are retried and end in [`ApiError::RetriesExhausted`].
    #[instrument(skip(self, query), fields(group = self.group(), endpoint = %endpoint))]
    pub async fn get_json(
        &self,
        endpoint: Endpoint,
        parts: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let uri = self.endpoint_uri(endpoint, parts);
        match self.run_with_retry(&uri, query, Expect::Envelope).await? {
            Attempted::Data(value) => Ok(value),
            Attempted::Body(_) | Attempted::Rejected => Err(ApiError::malformed(
                &uri,
                "asset response where an envelope was expected",
            )),
        }
    }

    /// Same as [`get_json`](Self::get_json) but dispatches on an endpoint name.
    ///
    /// # Errors
    ///
    /// [`ApiError::UnknownEndpoint`] for names outside the endpoint table,
    /// before any request is made.
    pub async fn get_json_by_name(
        &self,
        name: &str,
        parts: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let endpoint = Endpoint::from_name(name)?;
        self.get_json(endpoint, parts, query).await
    }

    /// Downloads a binary asset and writes it to `sink` once it has passed
    /// classification.
    ///
    /// # Errors
    ///
    /// Same as [`get_json`](Self::get_json), plus [`ApiError::Sink`] when
    /// writing fails.
    #[instrument(skip(self, sink), fields(url = %url))]
    pub async fn download_file<W>(&self, url: &str, sink: &mut W) -> Result<DownloadOutcome, ApiError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match self.download_bytes(url).await? {
            Fetched::RejectedByOrigin => Ok(DownloadOutcome::RejectedByOrigin),
            Fetched::Body(body) => {
                let sink_error = |source| ApiError::Sink {
                    uri: url.to_string(),
                    source,
                };
                sink.write_all(&body).await.map_err(sink_error)?;
                sink.flush().await.map_err(sink_error)?;
                Ok(DownloadOutcome::Written(body.len() as u64))
            }
        }
    }

    /// Downloads a binary asset into memory.
    ///
    /// # Errors
    ///
    /// Same as [`get_json`](Self::get_json).
    pub async fn download_bytes(&self, url: &str) -> Result<Fetched, ApiError> {
        match self.run_with_retry(url, &[], Expect::Asset).await? {
            Attempted::Body(body) => Ok(Fetched::Body(body)),
            Attempted::Rejected => Ok(Fetched::RejectedByOrigin),
            Attempted::Data(_) => Err(ApiError::malformed(url, "unexpected envelope")),
        }
    }

    /// One unclassified GET, after the minimum delay. Used where the error
    /// response itself carries the information needed.
    ///
    /// # Errors
    ///
    /// Connection-level failures only.
    pub async fn get_unclassified(&self, url: &str) -> Result<RawResponse, ApiError> {
        self.sleep_min_delay().await;
        self.transport.request(Method::GET, url, &[], true).await
    }

    async fn sleep_min_delay(&self) {
        let delay = self.session.min_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn run_with_retry(
        &self,
        uri: &str,
        query: &[(&str, String)],
        expect: Expect,
    ) -> Result<Attempted, ApiError> {
        self.sleep_min_delay().await;

        let mut attempt = 0u32;
        loop {
            let error = match self.attempt(uri, query, expect).await {
                Ok(attempted) => return Ok(attempted),
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            match self.policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        uri,
                        attempt = next_attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(uri, %reason, "not retrying");
                    if failure_type == FailureType::Recoverable {
                        warn!(uri, attempts = attempt + 1, error = %error, "giving up");
                        // The attempt's own URI carries the query string.
                        let full_uri = error.uri().unwrap_or(uri).to_string();
                        return Err(ApiError::RetriesExhausted {
                            uri: full_uri,
                            attempts: attempt + 1,
                            last: Box::new(error),
                        });
                    }
                    return Err(error);
                }
            }
        }
    }

    async fn attempt(
        &self,
        uri: &str,
        query: &[(&str, String)],
        expect: Expect,
    ) -> Result<Attempted, ApiError> {
        let follow_redirects = expect == Expect::Asset;
        let response = self
            .transport
            .request(Method::GET, uri, query, follow_redirects)
            .await?;

        if expect == Expect::Asset && is_rejected_by_origin(response.status, &response.body) {
            warn!(uri, "origin flagged file as malware, skipping");
            return Ok(Attempted::Rejected);
        }

        classify_response(
            &response.uri,
            response.status,
            response.body.len(),
            self.session.suspicious_band(),
        )?;

        match expect {
            Expect::Envelope => {
                let envelope = Envelope::parse(&response.uri, &response.body)?;
                Ok(Attempted::Data(envelope.into_data(&response.uri)?))
            }
            Expect::Asset => Ok(Attempted::Body(response.body)),
        }
    }
}
