//! Resilient client for the groups JSON API.
//!
//! The service is undocumented and rate-sensitive. It answers a missing
//! login with a redirect, emits small placeholder bodies under load, and
//! truncates JSON mid-stream. This module turns those behaviours into typed
//! errors and retries the ones that are transient.
//!
//! # Layers
//!
//! - [`Transport`] - single exchanges with cookies, headers, pinned TLS roots
//! - [`classify_response`] - status/body-size to [`ApiError`] mapping
//! - [`BackoffPolicy`] - retry decisions with jittered backoff
//! - [`GroupsClient`] - endpoint table, retry loop, envelope unwrapping
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use archiver_core::api::{Endpoint, GroupsClient, Session, SessionCookie};
//!
//! # async fn example() -> Result<(), archiver_core::api::ApiError> {
//! let session = Session::new("mygroup")
//!     .with_cookie(SessionCookie::new("T", "..."))
//!     .with_cookie(SessionCookie::new("Y", "..."))
//!     .with_min_delay(Duration::from_millis(200));
//! let client = GroupsClient::new(session)?;
//! let info = client.get_json(Endpoint::GroupInfo, &[], &[]).await?;
//! println!("{}", info["name"]);
//! # Ok(())
//! # }
//! ```

mod capture;
mod classify;
mod client;
pub mod constants;
mod endpoint;
mod envelope;
mod error;
mod retry;
mod session;
mod transport;

pub use capture::{CaptureScope, CapturedExchange, NoCapture};
pub use classify::{FailureType, classify_error, classify_response, is_rejected_by_origin};
pub use client::{DownloadOutcome, Fetched, GroupsClient};
pub use endpoint::{ApiVersion, Endpoint};
pub use envelope::Envelope;
pub use error::ApiError;
pub use retry::{BackoffPolicy, RetryDecision, backoff_delay};
pub use session::{Session, SessionCookie};
pub use transport::{RawResponse, Transport};
