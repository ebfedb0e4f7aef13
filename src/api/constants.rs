//! Constants for the API client (timeouts, retry limits, service quirks).
//!
//! Most of these values are empirical workarounds for the behavior of the
//! groups service and are not expected to hold for any other origin.

use std::ops::RangeInclusive;
use std::time::Duration;

/// Root of the JSON API.
pub const DEFAULT_BASE_URI: &str = "https://groups.yahoo.com/api";

/// Root of the non-API web pages (database CSV exports live here).
pub const DEFAULT_WEB_ROOT: &str = "https://groups.yahoo.com/neo";

/// Default maximum number of attempts per request.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One unit of backoff jitter; the jitter for attempt `n` is drawn from `[0, n)` units.
pub const DEFAULT_JITTER_UNIT: Duration = Duration::from_secs(1);

/// Response sizes in this band are placeholder bodies the service emits
/// under load and must be retried.
pub const SUSPICIOUS_SIZE_BAND: RangeInclusive<usize> = 60..=68;

/// Marker in a 400 body indicating the origin refuses to serve a flagged file.
pub const MALWARE_MARKER: &str = "malware";


/// Message listing page size.
pub const MESSAGE_PAGE_SIZE: usize = 1000;

/// Poll listing page size.
pub const POLL_PAGE_SIZE: usize = 100;

/// Items repeated at the start of each poll page after the first.
pub const POLL_PAGE_OVERLAP: usize = 1;

/// Photos per album page.
pub const ALBUM_PAGE_SIZE: u64 = 100;

/// Album count requested when looking up the real total.
pub const ALBUM_COUNT_LOOKUP: u64 = 5;

/// Member records per page.
pub const MEMBER_PAGE_SIZE: u64 = 100;

/// Root of the calendar API.
pub const CALENDAR_API_ROOT: &str = "https://calendar.yahoo.com/ws/v3";

/// First day of the event walk (service launch), as (year, month, day).
pub const CALENDAR_FIRST_DAY: (i32, u32, u32) = (2001, 1, 30);

/// The event walk stops before this day.
pub const CALENDAR_LAST_DAY: (i32, u32, u32) = (2025, 1, 1);

/// Days covered by one calendar request.
pub const CALENDAR_WINDOW_DAYS: u64 = 1000;
