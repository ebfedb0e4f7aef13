//! Email: message index pages, raw and rendered messages, their attachments.

use std::path::Path;

use tracing::{info, instrument, warn};

use super::attachments::save_files;
use super::context::TraversalContext;
use super::cursor::MessageCursor;
use super::error::ArchiveError;
use super::model::{Message, MessagePage, view};
use super::naming::sanitise_folder_name;
use super::MessageRange;
use crate::api::Endpoint;

#[instrument(skip_all)]
pub(crate) async fn archive(
    ctx: &TraversalContext<'_>,
    root: &Path,
    range: &MessageRange,
) -> Result<(), ArchiveError> {
    // Also the permission check for the whole family.
    let initial = ctx.client.get_json(Endpoint::Messages, &[], &[]).await?;
    let initial: MessagePage = view(&initial, "message listing")?;

    let ids = if range.is_empty() {
        let ids = archive_metadata(ctx, root).await?;
        info!(
            messages = ids.len(),
            max_id = ids.last().copied().unwrap_or_default(),
            "fetching all messages"
        );
        ids
    } else {
        let last_record_id = initial
            .last_record_id
            .ok_or_else(|| ArchiveError::missing("lastRecordId", "message listing"))?;
        let ids = range.resolve(last_record_id);
        if ids.is_empty() {
            warn!(?range, last_record_id, "message selection is empty");
        }
        ids
    };

    let total = ids.len();
    for (n, id) in ids.into_iter().enumerate() {
        archive_message(ctx, root, id, n + 1, total).await;
    }
    Ok(())
}

/// Walks the message index, writing each page, and returns the message ids.
async fn archive_metadata(
    ctx: &TraversalContext<'_>,
    root: &Path,
) -> Result<Vec<u64>, ArchiveError> {
    info!("archiving message metadata");
    let mut cursor = MessageCursor::default();
    let mut ids = Vec::new();

    while let Some(query) = cursor.next_query() {
        let page_value = ctx.client.get_json(Endpoint::Messages, &[], &query).await?;
        let path = root.join(format!("message_metadata_{}.json", cursor.page()));
        ctx.write_json(&path, &page_value).await?;

        let page: MessagePage = view(&page_value, "message metadata page")?;
        ids.extend(page.messages.iter().map(|m| m.message_id));
        info!(
            archived = ids.len(),
            total = page.total_records.unwrap_or_default(),
            "archived message metadata records"
        );
        cursor.advance(page.next_page_start);
    }
    Ok(ids)
}

async fn archive_message(ctx: &TraversalContext<'_>, root: &Path, id: u64, n: usize, total: usize) {
    let id_part = id.to_string();

    info!(id, n, total, "fetching raw message");
    let raw = async {
        let raw = ctx
            .client
            .get_json(Endpoint::Messages, &[id_part.as_str(), "raw"], &[])
            .await?;
        let path = root.join(format!("{id}_raw.json"));
        ctx.write_json(&path, &raw).await?;
        let message: Message = view(&raw, "raw message")?;
        ctx.set_mtime(&path, message.post_date).await;
        Ok::<_, ArchiveError>(())
    };
    if let Err(e) = raw.await {
        ctx.skip(&format!("message {id} (raw)"), &e);
    }

    info!(id, n, total, "fetching rendered message");
    let rendered = async {
        let html = ctx
            .client
            .get_json(Endpoint::Messages, &[id_part.as_str()], &[])
            .await?;
        let path = root.join(format!("{id}.json"));
        ctx.write_json(&path, &html).await?;
        let message: Message = view(&html, "message")?;
        ctx.set_mtime(&path, message.post_date).await;

        if !message.attachments_info.is_empty() {
            let dir = root.join(sanitise_folder_name(&format!("{id}_attachments")));
            ctx.create_dir(&dir).await?;
            save_files(ctx, &dir, &message.attachments_info).await;
            ctx.set_mtime(&dir, message.post_date).await;
        }
        Ok::<_, ArchiveError>(())
    };
    if let Err(e) = rendered.await {
        ctx.skip(&format!("message {id}"), &e);
    }
}
