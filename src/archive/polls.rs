//! Polls: converging walk of the poll list, then each poll.

use std::path::Path;

use tracing::{info, instrument};

use super::context::TraversalContext;
use super::cursor::PollCursor;
use super::error::ArchiveError;
use super::model::{Poll, PollSummary, view};
use super::naming::sanitise_file_name;
use crate::api::Endpoint;

#[instrument(skip_all)]
pub(crate) async fn archive(ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
    let mut cursor = PollCursor::default();
    while let Some(query) = cursor.next_query() {
        let page = ctx.client.get_json(Endpoint::Polls, &[], &query).await?;
        let page: Vec<PollSummary> = view(&page, "poll listing")?;
        info!(polls = page.len(), "got polls");
        cursor.absorb(page.into_iter().map(|poll| poll.survey_id).collect());
    }

    let ids = cursor.into_ids();
    let total = ids.len();
    info!(total, "found polls to grab");

    for (n, id) in ids.iter().enumerate() {
        let n = n + 1;
        info!(survey = %id, n, total, "downloading poll");
        let result = async {
            let poll = ctx
                .client
                .get_json(Endpoint::Polls, &[id.as_str()], &[])
                .await?;
            let path = root.join(sanitise_file_name(&format!("{n}-{id}.json")));
            ctx.write_json(&path, &poll).await?;
            let poll: Poll = view(&poll, "poll")?;
            ctx.set_mtime(&path, poll.date_created).await;
            Ok::<_, ArchiveError>(())
        };
        if let Err(e) = result.await {
            ctx.skip(&format!("poll {id}"), &e);
        }
    }
    Ok(())
}
