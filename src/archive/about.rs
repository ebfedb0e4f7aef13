//! About: group info, statistics, and the description and cover photos.

use std::path::Path;

use tracing::{info, instrument};

use super::context::TraversalContext;
use super::error::ArchiveError;
use super::model::{Statistics, view};
use super::naming::{sanitise_file_name, url_basename};
use super::variant::{PhotoVariant, VariantOutcome, download_best_variant, pick_best};
use crate::api::Endpoint;

#[instrument(skip_all)]
pub(crate) async fn archive(ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
    info!("downloading group description data");
    let info = ctx.client.get_json(Endpoint::GroupInfo, &[], &[]).await?;
    ctx.write_json(&root.join("about.json"), &info).await?;

    let statistics = ctx.client.get_json(Endpoint::Statistics, &[], &[]).await?;
    ctx.write_json(&root.join("statistics.json"), &statistics)
        .await?;
    let statistics: Statistics = view(&statistics, "statistics")?;

    if let Some(variants) = statistics
        .group_home_page
        .and_then(|page| page.photo_info)
        .filter(|variants| !variants.is_empty())
    {
        save_photo(ctx, root, "GroupPhoto", &variants).await;
    }

    if let Some(cover) = statistics
        .group_cover_photo
        .filter(|cover| cover.has_cover_image)
    {
        save_photo(ctx, root, "GroupCover", &cover.photo_info).await;
    }
    Ok(())
}

/// Saves the best variant as `<prefix>-<basename of its URL>`.
async fn save_photo(ctx: &TraversalContext<'_>, root: &Path, prefix: &str, variants: &[PhotoVariant]) {
    let Some(best) = pick_best(variants, &[]) else {
        return;
    };
    let file_name = sanitise_file_name(&format!("{prefix}-{}", url_basename(&best.display_url)));
    info!(file_name, "downloading group photo");
    let path = root.join(file_name);
    match download_best_variant(ctx, variants, &path).await {
        Ok(VariantOutcome::Saved(_) | VariantOutcome::Rejected) => {}
        Ok(VariantOutcome::Exhausted) => ctx.stats.increment_skipped(),
        Err(e) => ctx.skip(prefix, &e),
    }
}
