//! Attachments: the group-wide attachment list, and the file-saving routine
//! shared with message attachments.

use std::path::Path;

use tracing::{error, info, instrument};

use super::context::TraversalContext;
use super::error::ArchiveError;
use super::model::{Attachment, AttachmentFile, AttachmentList, view};
use super::naming::{sanitise_file_name, sanitise_folder_name};
use super::variant::{VariantOutcome, download_best_variant};
use crate::api::Endpoint;

#[instrument(skip_all)]
pub(crate) async fn archive(ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
    let listing = ctx.client.get_json(Endpoint::Attachments, &[], &[]).await?;
    ctx.write_json(
        &root.join("allattachmentinfo.json"),
        &listing["attachments"],
    )
    .await?;
    let listing: AttachmentList = view(&listing, "attachment listing")?;

    let total = listing.attachments.len();
    for (n, summary) in listing.attachments.iter().enumerate() {
        let id = summary.attachment_id.as_str();
        info!(attachment = id, n = n + 1, total, "fetching attachment");
        let dir = root.join(sanitise_folder_name(id));

        let result = async {
            ctx.create_dir(&dir).await?;
            let detail = ctx
                .client
                .get_json(Endpoint::Attachments, &[id], &[])
                .await?;
            ctx.write_json(&dir.join("attachmentinfo.json"), &detail)
                .await?;
            let detail: Attachment = view(&detail, "attachment")?;
            save_files(ctx, &dir, &detail.files).await;
            Ok::<_, ArchiveError>(())
        };
        match result.await {
            Ok(()) => ctx.set_mtime(&dir, summary.modification_date).await,
            Err(e) => ctx.skip(&format!("attachment {id}"), &e),
        }
    }
    Ok(())
}

/// Saves each file of an attachment record into `dir`.
///
/// Files with a direct link are downloaded as-is; photos go through the
/// variant downgrade loop. Failures are logged and skipped.
pub(crate) async fn save_files(ctx: &TraversalContext<'_>, dir: &Path, files: &[AttachmentFile]) {
    for file in files {
        info!(filename = %file.filename, "fetching attachment file");
        let path = dir.join(sanitise_file_name(&format!(
            "{}-{}",
            file.file_id, file.filename
        )));

        let saved = if let Some(link) = &file.link {
            match ctx.download_to(link, &path).await {
                Ok(written) => written,
                Err(e) => {
                    ctx.skip(&format!("attachment file {}", file.filename), &e);
                    false
                }
            }
        } else if !file.photo_info.is_empty() {
            match download_best_variant(ctx, &file.photo_info, &path).await {
                Ok(VariantOutcome::Saved(_)) => true,
                Ok(VariantOutcome::Rejected) => false,
                Ok(VariantOutcome::Exhausted) => {
                    ctx.stats.increment_skipped();
                    false
                }
                Err(e) => {
                    ctx.skip(&format!("attachment photo {}", file.filename), &e);
                    false
                }
            }
        } else {
            error!(filename = %file.filename, "attachment has neither link nor photo info");
            false
        };

        if saved {
            ctx.set_mtime(&path, file.modification_date).await;
        }
    }
}
