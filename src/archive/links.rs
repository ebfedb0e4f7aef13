//! Links: recursive walk of link folders.

use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use tracing::{info, instrument};

use super::context::TraversalContext;
use super::error::ArchiveError;
use super::model::{LinkListing, view};
use super::naming::sanitise_folder_name;
use crate::api::Endpoint;

#[instrument(skip_all)]
pub(crate) async fn archive(ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
    walk(*ctx, root.to_path_buf(), String::new()).await
}

/// `linkdir` is the slash-joined folder path; empty for the top level.
fn walk(
    ctx: TraversalContext<'_>,
    dir: PathBuf,
    linkdir: String,
) -> BoxFuture<'_, Result<(), ArchiveError>> {
    Box::pin(async move {
        let listing = ctx
            .client
            .get_json(Endpoint::Links, &[], &[("linkdir", linkdir.clone())])
            .await?;
        ctx.write_json(&dir.join("links.json"), &listing).await?;
        let listing: LinkListing = view(&listing, "link listing")?;
        info!(links = listing.num_link, folder = %linkdir, "written links");

        for (i, sub) in listing.dirs.iter().enumerate() {
            let n = i + 1;
            info!(folder = %sub.folder, n, total = listing.num_dir, "fetching links folder");
            // Prefixed so folders that fold to the same name stay apart.
            let child = dir.join(sanitise_folder_name(&format!("{n}_{}", sub.folder)));
            let result = async {
                ctx.create_dir(&child).await?;
                walk(ctx, child.clone(), format!("{linkdir}/{}", sub.folder)).await
            };
            if let Err(e) = result.await {
                ctx.skip(&format!("links folder {}", sub.folder), &e);
            }
        }
        Ok(())
    })
}
