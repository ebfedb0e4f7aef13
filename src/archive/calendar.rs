//! Calendar: event windows from the separate calendar API.
//!
//! The calendar API wants a `wssid` token that is only handed out in the
//! error body of an unauthorised request, so the walk starts with a request
//! that is expected to fail.

use std::path::Path;

use chrono::{Days, NaiveDate};
use tracing::{info, instrument};

use super::context::TraversalContext;
use super::error::ArchiveError;
use super::model::{CalendarRejection, CalendarWindow, GroupInfo, view};
use crate::api::constants::{CALENDAR_FIRST_DAY, CALENDAR_LAST_DAY, CALENDAR_WINDOW_DAYS};
use crate::api::{Endpoint, Fetched};

#[instrument(skip_all)]
pub(crate) async fn archive(ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
    let info = ctx.client.get_json(Endpoint::GroupInfo, &[], &[]).await?;
    let info: GroupInfo = view(&info, "group info")?;
    let entity_id = info
        .entity_id
        .ok_or_else(|| ArchiveError::missing("entityId", "group info"))?;

    let events_root = format!(
        "{}/users/{}/calendars/events/",
        ctx.client.session().calendar_root(),
        urlencoding::encode(entity_id.as_str())
    );
    let wssid = fetch_wssid(ctx, &events_root).await?;

    for (start, end) in windows() {
        let (start, end) = (start.format("%Y%m%d").to_string(), end.format("%Y%m%d").to_string());
        info!(%start, %end, "fetching events");
        let url = format!(
            "{events_root}?format=json&dtstart={start}&dtend={end}&wssid={}",
            urlencoding::encode(&wssid)
        );
        if let Err(e) = archive_window(ctx, root, &url, &start, &end).await {
            ctx.skip(&format!("events {start}-{end}"), &e);
        }
    }
    Ok(())
}

/// Every window as (start, end) with `end` the start of the next one.
fn windows() -> Vec<(NaiveDate, NaiveDate)> {
    let (Some(mut start), Some(last)) = (ymd(CALENDAR_FIRST_DAY), ymd(CALENDAR_LAST_DAY)) else {
        return Vec::new();
    };
    let step = Days::new(CALENDAR_WINDOW_DAYS);
    let mut out = Vec::new();
    while start < last {
        let Some(end) = start.checked_add_days(step) else {
            break;
        };
        out.push((start, end));
        start = end;
    }
    out
}

fn ymd((year, month, day): (i32, u32, u32)) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

async fn fetch_wssid(ctx: &TraversalContext<'_>, events_root: &str) -> Result<String, ArchiveError> {
    let url = format!("{events_root}?format=json&dtstart=20000101&dtend=20000201&wssid=Dummy");
    let response = ctx.client.get_unclassified(&url).await?;
    match response.status {
        401 | 403 => {
            let rejection: CalendarRejection = serde_json::from_slice(&response.body)
                .map_err(|e| ArchiveError::shape("calendar handshake", e))?;
            rejection
                .calendar_error
                .wssid
                .ok_or_else(|| ArchiveError::missing("wssid", "calendar handshake"))
        }
        200 => Err(ArchiveError::unexpected(
            response.uri,
            "wssid handshake unexpectedly succeeded",
        )),
        status => Err(ArchiveError::unexpected(
            response.uri,
            format!("wssid handshake returned HTTP {status}"),
        )),
    }
}

async fn archive_window(
    ctx: &TraversalContext<'_>,
    root: &Path,
    url: &str,
    start: &str,
    end: &str,
) -> Result<(), ArchiveError> {
    let Fetched::Body(body) = ctx.client.download_bytes(url).await? else {
        return Ok(());
    };
    let content: serde_json::Value =
        serde_json::from_slice(&body).map_err(|e| ArchiveError::shape("calendar events", e))?;
    let window: CalendarWindow = view(&content, "calendar events")?;
    if window.events.count > 0 {
        info!(events = window.events.count, "got events");
        ctx.write_json(&root.join(format!("{start}-{end}.json")), &content)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_cover_launch_to_cutoff() {
        let windows = windows();
        let first = windows.first().copied();
        assert_eq!(
            first.map(|(s, _)| s.format("%Y%m%d").to_string()).as_deref(),
            Some("20010130")
        );
        assert_eq!(
            first.map(|(_, e)| e.format("%Y%m%d").to_string()).as_deref(),
            Some("20031027")
        );
        for pair in windows.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        let last_start = windows.last().map(|(s, _)| *s);
        assert!(last_start < ymd(CALENDAR_LAST_DAY));
        assert_eq!(windows.len(), 9);
    }
}
