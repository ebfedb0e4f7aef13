//! Per-run counters shared by every traversal.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Statistics for one archive run.
///
/// Threaded through the traversal context instead of living in globals.
#[derive(Debug, Default)]
pub struct ArchiveStats {
    artifacts_written: AtomicUsize,
    bytes_written: AtomicU64,
    items_skipped: AtomicUsize,
    assets_rejected: AtomicUsize,
    families_completed: AtomicUsize,
    families_aborted: AtomicUsize,
    families_skipped: AtomicUsize,
}

impl ArchiveStats {
    /// Creates a tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files written (JSON and binary).
    #[must_use]
    pub fn artifacts_written(&self) -> usize {
        self.artifacts_written.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::SeqCst)
    }

    /// Items (messages, files, photos, ...) that failed and were skipped.
    #[must_use]
    pub fn items_skipped(&self) -> usize {
        self.items_skipped.load(Ordering::SeqCst)
    }

    /// Assets the origin refused to serve.
    #[must_use]
    pub fn assets_rejected(&self) -> usize {
        self.assets_rejected.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn families_completed(&self) -> usize {
        self.families_completed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn families_aborted(&self) -> usize {
        self.families_aborted.load(Ordering::SeqCst)
    }

    /// Families skipped because their output already existed.
    #[must_use]
    pub fn families_skipped(&self) -> usize {
        self.families_skipped.load(Ordering::SeqCst)
    }

    pub(crate) fn record_artifact(&self, bytes: usize) {
        self.artifacts_written.fetch_add(1, Ordering::SeqCst);
        self.bytes_written.fetch_add(bytes as u64, Ordering::SeqCst);
    }

    pub(crate) fn increment_skipped(&self) {
        self.items_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_rejected(&self) {
        self.assets_rejected.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_completed(&self) {
        self.families_completed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_aborted(&self) {
        self.families_aborted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_families_skipped(&self) {
        self.families_skipped.fetch_add(1, Ordering::SeqCst);
    }
}
