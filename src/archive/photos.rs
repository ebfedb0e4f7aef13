//! Photos: albums, their photo pages, and the photos themselves.

use std::path::Path;

use tracing::{info, instrument};

use super::context::TraversalContext;
use super::error::ArchiveError;
use super::model::{Album, AlbumList, PhotoPage, view};
use super::naming::{html_unescape, sanitise_file_name, sanitise_folder_name};
use super::variant::{VariantOutcome, download_best_variant};
use crate::api::Endpoint;
use crate::api::constants::{ALBUM_COUNT_LOOKUP, ALBUM_PAGE_SIZE};

#[instrument(skip_all)]
pub(crate) async fn archive(ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
    // The reported total is sometimes one short, so ask for one more.
    let count = ctx
        .client
        .get_json(
            Endpoint::Albums,
            &[],
            &[("count", ALBUM_COUNT_LOOKUP.to_string())],
        )
        .await?;
    let count: AlbumList = view(&count, "album count")?;
    let album_count = count.total + 1;

    let albums = ctx
        .client
        .get_json(Endpoint::Albums, &[], &[("count", album_count.to_string())])
        .await?;
    ctx.write_json(&root.join("albums.json"), &albums["albums"])
        .await?;
    let albums: AlbumList = view(&albums, "album listing")?;

    for (n, album) in albums.albums.iter().enumerate() {
        let name = html_unescape(&album.album_name);
        info!(album = %name, n = n + 1, total = albums.total, "fetching album");
        let dir = root.join(sanitise_folder_name(&format!("{}-{name}", album.album_id)));
        match archive_album(ctx, &dir, album).await {
            Ok(()) => ctx.set_mtime(&dir, album.modification_date).await,
            Err(e) => ctx.skip(&format!("album {name}"), &e),
        }
    }
    Ok(())
}

async fn archive_album(
    ctx: &TraversalContext<'_>,
    dir: &Path,
    album: &Album,
) -> Result<(), ArchiveError> {
    ctx.create_dir(dir).await?;
    let album_id = album.album_id.as_str();

    let first = ctx.client.get_json(Endpoint::Albums, &[album_id], &[]).await?;
    let first: PhotoPage = view(&first, "album")?;
    let pages = first.total / ALBUM_PAGE_SIZE + 1;

    let mut fetched = 0usize;
    for page in 0..pages {
        let query = [
            ("start", (page * ALBUM_PAGE_SIZE).to_string()),
            ("count", ALBUM_PAGE_SIZE.to_string()),
        ];
        let photos = ctx
            .client
            .get_json(Endpoint::Albums, &[album_id], &query)
            .await?;
        ctx.write_json(&dir.join(format!("photos-{page}.json")), &photos["photos"])
            .await?;
        let photos: PhotoPage = view(&photos, "photo page")?;

        for photo in &photos.photos {
            fetched += 1;
            let name = html_unescape(&photo.photo_name);
            info!(photo = %name, n = fetched, total = photos.total, "fetching photo");
            let path = dir.join(sanitise_file_name(&format!("{}-{name}.jpg", photo.photo_id)));
            match download_best_variant(ctx, &photo.photo_info, &path).await {
                Ok(VariantOutcome::Saved(_)) => ctx.set_mtime(&path, photo.creation_date).await,
                Ok(VariantOutcome::Rejected) => {}
                Ok(VariantOutcome::Exhausted) => ctx.stats.increment_skipped(),
                Err(e) => ctx.skip(&format!("photo {name}"), &e),
            }
        }
    }
    Ok(())
}
