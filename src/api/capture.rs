//! Pass-through capture of raw exchanges for later verification.
//!
//! The transport hands every completed exchange to a [`CaptureScope`]. A
//! recorder that writes an archival container (WARC or similar) lives
//! outside this crate; [`NoCapture`] is used when none is installed.

use std::fmt;

/// One completed request/response pair as seen on the wire.
#[derive(Debug, Clone, Copy)]
pub struct CapturedExchange<'a> {
    pub method: &'a str,
    /// Final request URI including the query string.
    pub uri: &'a str,
    pub status: u16,
    pub response_headers: &'a [(String, String)],
    pub body: &'a [u8],
}

/// Receives every exchange the transport completes, retries included.
pub trait CaptureScope: Send + Sync + fmt::Debug {
    fn record(&self, exchange: &CapturedExchange<'_>);
}

/// Capture disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl CaptureScope for NoCapture {
    fn record(&self, _exchange: &CapturedExchange<'_>) {}
}
