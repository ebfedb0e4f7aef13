//! The per-traversal handle threaded through every family walk.

use std::fmt;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use super::error::ArchiveError;
use super::stats::ArchiveStats;
use super::store::ArtifactStore;
use super::ResourceFamily;
use crate::api::{Fetched, GroupsClient};

/// Everything a traversal needs: the client, where to write, what to count.
#[derive(Clone, Copy)]
pub struct TraversalContext<'a> {
    pub client: &'a GroupsClient,
    pub store: &'a dyn ArtifactStore,
    pub stats: &'a ArchiveStats,
    pub family: ResourceFamily,
}

impl fmt::Debug for TraversalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalContext")
            .field("group", &self.client.group())
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

impl TraversalContext<'_> {
    /// Writes a JSON artifact and counts it.
    pub async fn write_json(&self, path: &Path, value: &Value) -> Result<(), ArchiveError> {
        let bytes = self.store.write_json(path, value).await?;
        self.stats.record_artifact(bytes);
        Ok(())
    }

    /// Downloads `url` into `path`.
    ///
    /// Returns `false`, writing nothing, when the origin refuses the file.
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<bool, ArchiveError> {
        match self.client.download_bytes(url).await? {
            Fetched::Body(body) => {
                self.store.write_bytes(path, &body).await?;
                self.stats.record_artifact(body.len());
                Ok(true)
            }
            Fetched::RejectedByOrigin => {
                self.stats.increment_rejected();
                Ok(false)
            }
        }
    }

    pub async fn create_dir(&self, path: &Path) -> Result<(), ArchiveError> {
        self.store.create_dir(path).await
    }

    /// Applies the origin timestamp, if the payload had one.
    pub async fn set_mtime(&self, path: &Path, epoch_secs: Option<i64>) {
        match epoch_secs {
            Some(secs) => self.store.set_mtime(path, secs).await,
            None => debug!(path = %path.display(), "no origin timestamp"),
        }
    }

    /// Logs a failed item and counts it as skipped.
    pub fn skip(&self, item: &str, error: &ArchiveError) {
        self.stats.increment_skipped();
        warn!(
            family = %self.family,
            item,
            uri = error.uri().unwrap_or("-"),
            error = %error,
            "item failed, skipping"
        );
    }
}
