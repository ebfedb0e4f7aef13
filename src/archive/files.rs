//! Files: recursive walk of the group's file tree.

use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use tracing::{debug, info, instrument, warn};

use super::context::TraversalContext;
use super::error::ArchiveError;
use super::model::{DirEntry, FileListing, view};
use super::naming::{html_unescape, sanitise_file_name, sanitise_folder_name};
use crate::api::Endpoint;

#[instrument(skip_all)]
pub(crate) async fn archive(ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
    walk(*ctx, root.to_path_buf(), None).await
}

/// Lists one directory, saves its files, and descends into its folders.
///
/// Only a failure to list `dir` itself is returned; failures below it are
/// logged and skipped.
fn walk(
    ctx: TraversalContext<'_>,
    dir: PathBuf,
    sfpath: Option<String>,
) -> BoxFuture<'_, Result<(), ArchiveError>> {
    Box::pin(async move {
        let query: Vec<(&str, String)> = sfpath
            .iter()
            .map(|path| ("sfpath", path.clone()))
            .collect();
        let listing = ctx.client.get_json(Endpoint::Files, &[], &query).await?;
        ctx.write_json(&dir.join("fileinfo.json"), &listing["dirEntries"])
            .await?;
        let listing: FileListing = view(&listing, "file listing")?;

        let count = listing.dir_entries.len();
        if let Some(total) = listing.total {
            if usize::try_from(total).ok() != Some(count) {
                warn!(
                    dir = %dir.display(),
                    reported = total,
                    listed = count,
                    "file listing total disagrees with entries"
                );
            }
        }

        for (i, entry) in listing.dir_entries.iter().enumerate() {
            let n = i + 1;
            let name = html_unescape(&entry.file_name);
            match entry.kind {
                DirEntry::FILE => save_file(&ctx, &dir, entry, &name, n, count).await,
                DirEntry::DIRECTORY => {
                    let folder = dir.join(sanitise_folder_name(&format!("{n}_{name}")));
                    info!(name, folder = %folder.display(), n, count, "fetching directory");
                    if let Err(e) = descend(ctx, &folder, entry).await {
                        ctx.skip(&format!("directory {name}"), &e);
                        continue;
                    }
                    ctx.set_mtime(&folder, entry.created_time).await;
                }
                other => debug!(kind = other, name, "ignoring unknown entry type"),
            }
        }
        Ok(())
    })
}

async fn descend(
    ctx: TraversalContext<'_>,
    folder: &Path,
    entry: &DirEntry,
) -> Result<(), ArchiveError> {
    let path_uri = entry
        .path_uri
        .as_deref()
        .ok_or_else(|| ArchiveError::missing("pathURI", format!("directory {}", entry.file_name)))?;
    let sfpath = urlencoding::decode(path_uri)
        .map_or_else(|_| path_uri.to_string(), |decoded| decoded.into_owned());
    ctx.create_dir(folder).await?;
    walk(ctx, folder.to_path_buf(), Some(sfpath)).await
}

async fn save_file(
    ctx: &TraversalContext<'_>,
    dir: &Path,
    entry: &DirEntry,
    name: &str,
    n: usize,
    count: usize,
) {
    let file_name = sanitise_file_name(&format!("{n}_{name}"));
    info!(name, file_name, n, count, "fetching file");
    let path = dir.join(&file_name);

    let Some(url) = entry.download_url.as_deref() else {
        ctx.skip(
            &format!("file {name}"),
            &ArchiveError::missing("downloadURL", format!("file {name}")),
        );
        return;
    };
    match ctx.download_to(url, &path).await {
        Ok(true) => ctx.set_mtime(&path, entry.created_time).await,
        Ok(false) => {}
        Err(e) => ctx.skip(&format!("file {name}"), &e),
    }
}
