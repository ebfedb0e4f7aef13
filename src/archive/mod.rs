//! Traversal engine turning API listings into an on-disk archive.
//!
//! Each resource family (messages, files, photos, ...) has its own module
//! that walks the relevant listings and persists one artifact per page or
//! item before moving on, so an interrupted run leaves a usable prefix.
//!
//! A family that cannot be accessed at all ends as
//! [`FamilyOutcome::Aborted`]; the remaining families still run. Failures of
//! single items are logged, counted in [`ArchiveStats`], and skipped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use archiver_core::api::{GroupsClient, Session};
//! use archiver_core::archive::{ArchiveOptions, Archiver, FsStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GroupsClient::new(Session::new("mygroup"))?;
//! let store = Arc::new(FsStore::new("archive/mygroup"));
//! let archiver = Archiver::new(client, store, ArchiveOptions::default());
//! let report = archiver.run().await;
//! println!("{} families aborted", report.aborted().count());
//! # Ok(())
//! # }
//! ```

mod about;
mod attachments;
mod calendar;
mod context;
mod cursor;
mod database;
mod error;
mod files;
mod links;
mod members;
mod messages;
mod model;
mod naming;
mod photos;
mod polls;
mod stats;
mod store;
mod variant;

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};

pub use context::TraversalContext;
pub use cursor::{MessageCursor, PollCursor};
pub use error::ArchiveError;
pub use model::ItemId;
pub use naming::{html_unescape, sanitise_file_name, sanitise_folder_name};
pub use stats::ArchiveStats;
pub use store::{ArtifactStore, FsStore, MemoryStore, encode_json};
pub use variant::{PhotoQuality, PhotoVariant, VariantOutcome, download_best_variant, pick_best};

use crate::api::GroupsClient;

/// Empty file written into a family's folder once its traversal succeeds.
/// Aborted families never get one, so `skip_existing` retries them.
pub const COMPLETE_MARKER: &str = ".complete";

/// One independently archived section of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceFamily {
    Email,
    Files,
    Photos,
    Databases,
    Links,
    Calendar,
    About,
    Polls,
    Attachments,
    Members,
}

impl ResourceFamily {
    /// Every family, in archive order.
    pub const ALL: [Self; 10] = [
        Self::Email,
        Self::Files,
        Self::Photos,
        Self::Databases,
        Self::Links,
        Self::Calendar,
        Self::About,
        Self::Polls,
        Self::Attachments,
        Self::Members,
    ];

    /// Output directory below the group root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Files => "files",
            Self::Photos => "photos",
            Self::Databases => "databases",
            Self::Links => "links",
            Self::Calendar => "calendar",
            Self::About => "about",
            Self::Polls => "polls",
            Self::Attachments => "attachments",
            Self::Members => "members",
        }
    }
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for ResourceFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.dir_name() == s)
            .ok_or_else(|| format!("unknown resource family '{s}'"))
    }
}

/// Which messages to fetch instead of walking the whole listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRange {
    pub ids: Vec<u64>,
    pub start: Option<u64>,
    pub stop: Option<u64>,
}

impl MessageRange {
    /// True when no selection was made and the full listing should be walked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.start.is_none() && self.stop.is_none()
    }

    /// Resolves the selection against the highest existing message id.
    ///
    /// `start` defaults to 1 and `stop` to `last_record_id`; `stop` is also
    /// clamped to it. Explicit ids are merged in. The result is sorted and
    /// free of duplicates.
    #[must_use]
    pub fn resolve(&self, last_record_id: u64) -> Vec<u64> {
        let mut selected: BTreeSet<u64> = self.ids.iter().copied().collect();
        if self.start.is_some() || self.stop.is_some() {
            let start = self.start.unwrap_or(1);
            let stop = self.stop.unwrap_or(last_record_id).min(last_record_id);
            selected.extend(start..=stop);
        }
        selected.into_iter().collect()
    }
}

/// Per-run options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub families: BTreeSet<ResourceFamily>,
    pub messages: MessageRange,
    /// Skip a family that a previous run completed.
    pub skip_existing: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            families: ResourceFamily::ALL.into_iter().collect(),
            messages: MessageRange::default(),
            skip_existing: false,
        }
    }
}

/// How one family's traversal ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyOutcome {
    Completed,
    /// A previous run completed it and `skip_existing` was set.
    SkippedExisting,
    Aborted {
        reason: String,
        uri: Option<String>,
        /// The session lacks access (auth or not found).
        inaccessible: bool,
    },
}

/// Outcome of every family that was selected, in archive order.
#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    pub outcomes: Vec<(ResourceFamily, FamilyOutcome)>,
}

impl ArchiveReport {
    pub fn aborted(&self) -> impl Iterator<Item = &(ResourceFamily, FamilyOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, FamilyOutcome::Aborted { .. }))
    }

    #[must_use]
    pub fn outcome(&self, family: ResourceFamily) -> Option<&FamilyOutcome> {
        self.outcomes
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, outcome)| outcome)
    }
}

/// Runs the selected family traversals one after another.
pub struct Archiver {
    client: GroupsClient,
    store: Arc<dyn ArtifactStore>,
    options: ArchiveOptions,
    stats: ArchiveStats,
}

impl fmt::Debug for Archiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archiver")
            .field("client", &self.client)
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Archiver {
    #[must_use]
    pub fn new(client: GroupsClient, store: Arc<dyn ArtifactStore>, options: ArchiveOptions) -> Self {
        Self {
            client,
            store,
            options,
            stats: ArchiveStats::new(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> &ArchiveStats {
        &self.stats
    }

    #[must_use]
    pub fn client(&self) -> &GroupsClient {
        &self.client
    }

    /// Runs every selected family. Never fails as a whole.
    pub async fn run(&self) -> ArchiveReport {
        info!(
            group = self.client.group(),
            families = self.options.families.len(),
            "archive starting"
        );
        let mut report = ArchiveReport::default();
        for family in ResourceFamily::ALL {
            if self.options.families.contains(&family) {
                let outcome = self.run_family(family).await;
                report.outcomes.push((family, outcome));
            }
        }
        info!(
            artifacts = self.stats.artifacts_written(),
            bytes = self.stats.bytes_written(),
            skipped_items = self.stats.items_skipped(),
            completed = self.stats.families_completed(),
            aborted = self.stats.families_aborted(),
            "archive finished"
        );
        report
    }

    /// Runs one family and classifies how it ended.
    pub async fn run_family(&self, family: ResourceFamily) -> FamilyOutcome {
        let root = Path::new(family.dir_name());
        let marker = root.join(COMPLETE_MARKER);
        if self.options.skip_existing && self.store.exists(&marker).await {
            info!(%family, "family already complete, skipping");
            self.stats.increment_families_skipped();
            return FamilyOutcome::SkippedExisting;
        }

        let ctx = TraversalContext {
            client: &self.client,
            store: self.store.as_ref(),
            stats: &self.stats,
            family,
        };
        let span = info_span!("family", %family);
        let result = async {
            info!("archiving");
            ctx.create_dir(root).await?;
            self.dispatch(&ctx, root).await
        }
        .instrument(span)
        .await;

        match result {
            Ok(()) => {
                if let Err(e) = self.store.write_bytes(&marker, b"").await {
                    warn!(%family, error = %e, "could not mark family complete");
                }
                self.stats.increment_completed();
                info!(%family, "family complete");
                FamilyOutcome::Completed
            }
            Err(e) => {
                self.stats.increment_aborted();
                let inaccessible = e.is_inaccessible();
                if inaccessible {
                    error!(%family, uri = e.uri().unwrap_or("-"), error = %e, "family not accessible to this session");
                } else {
                    warn!(%family, uri = e.uri().unwrap_or("-"), error = %e, "family aborted");
                }
                FamilyOutcome::Aborted {
                    reason: e.to_string(),
                    uri: e.uri().map(str::to_string),
                    inaccessible,
                }
            }
        }
    }

    async fn dispatch(&self, ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
        match ctx.family {
            ResourceFamily::Email => messages::archive(ctx, root, &self.options.messages).await,
            ResourceFamily::Files => files::archive(ctx, root).await,
            ResourceFamily::Photos => photos::archive(ctx, root).await,
            ResourceFamily::Databases => database::archive(ctx, root).await,
            ResourceFamily::Links => links::archive(ctx, root).await,
            ResourceFamily::Calendar => calendar::archive(ctx, root).await,
            ResourceFamily::About => about::archive(ctx, root).await,
            ResourceFamily::Polls => polls::archive(ctx, root).await,
            ResourceFamily::Attachments => attachments::archive(ctx, root).await,
            ResourceFamily::Members => members::archive(ctx, root).await,
        }
    }
}
