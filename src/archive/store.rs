//! Where archive artifacts go.
//!
//! Traversals never touch the process working directory; they compose
//! relative paths and hand them to an [`ArtifactStore`]. [`FsStore`] writes
//! under a root directory, [`MemoryStore`] keeps everything in memory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, warn};

use super::error::ArchiveError;

/// Encodes a JSON artifact: UTF-8, non-ASCII kept as-is, four-space indent.
///
/// # Errors
///
/// [`ArchiveError::Encode`] if serialization fails.
pub fn encode_json(path: &Path, value: &Value) -> Result<Vec<u8>, ArchiveError> {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .map_err(|source| ArchiveError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(out)
}

/// Sink for archive artifacts, addressed by paths relative to the archive root.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Creates a directory and any missing parents.
    async fn create_dir(&self, path: &Path) -> Result<(), ArchiveError>;

    /// Writes a complete file, creating parent directories as needed.
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), ArchiveError>;

    /// True if a file or directory exists at `path`.
    async fn exists(&self, path: &Path) -> bool;

    /// Sets the modification time to `epoch_secs`. Best effort.
    async fn set_mtime(&self, path: &Path, epoch_secs: i64);

    /// Writes a pretty-printed JSON artifact.
    async fn write_json(&self, path: &Path, value: &Value) -> Result<usize, ArchiveError> {
        let bytes = encode_json(path, value)?;
        self.write_bytes(path, &bytes).await?;
        Ok(bytes.len())
    }
}

fn epoch_to_system_time(epoch_secs: i64) -> Option<SystemTime> {
    let secs = u64::try_from(epoch_secs).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

/// Writes artifacts below a root directory on disk.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Creates a store rooted at `root`. Nothing is created until the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ArtifactStore for FsStore {
    async fn create_dir(&self, path: &Path) -> Result<(), ArchiveError> {
        tokio::fs::create_dir_all(self.resolve(path))
            .await
            .map_err(|e| ArchiveError::store(path, e))
    }

    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), ArchiveError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArchiveError::store(path, e))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| ArchiveError::store(path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(self.resolve(path))
            .await
            .unwrap_or(false)
    }

    async fn set_mtime(&self, path: &Path, epoch_secs: i64) {
        let Some(time) = epoch_to_system_time(epoch_secs) else {
            warn!(path = %path.display(), epoch_secs, "timestamp out of range, mtime not set");
            return;
        };
        let full = self.resolve(path);
        let result = tokio::task::spawn_blocking(move || {
            std::fs::File::open(&full).and_then(|file| file.set_modified(time))
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "failed to set mtime"),
            Err(e) => warn!(path = %path.display(), error = %e, "mtime task failed"),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    mtimes: BTreeMap<PathBuf, i64>,
}

/// Keeps artifacts in memory; for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Contents of the file at `path`.
    #[must_use]
    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// The file at `path` parsed as JSON.
    #[must_use]
    pub fn json(&self, path: impl AsRef<Path>) -> Option<Value> {
        self.file(path)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
    }

    /// Every file path, sorted.
    #[must_use]
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    #[must_use]
    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.lock().dirs.contains(path.as_ref())
    }

    #[must_use]
    pub fn mtime(&self, path: impl AsRef<Path>) -> Option<i64> {
        self.lock().mtimes.get(path.as_ref()).copied()
    }

    fn add_dir_chain(state: &mut MemoryState, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(ancestor.to_path_buf());
        }
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn create_dir(&self, path: &Path) -> Result<(), ArchiveError> {
        Self::add_dir_chain(&mut self.lock(), path);
        Ok(())
    }

    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), ArchiveError> {
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            Self::add_dir_chain(&mut state, parent);
        }
        state.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    async fn set_mtime(&self, path: &Path, epoch_secs: i64) {
        let mut state = self.lock();
        if state.files.contains_key(path) || state.dirs.contains(path) {
            state.mtimes.insert(path.to_path_buf(), epoch_secs);
        } else {
            warn!(path = %path.display(), "set_mtime on missing path");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_encode_json_four_space_indent_keeps_unicode() {
        let bytes = encode_json(Path::new("x.json"), &json!({"name": "café"})).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "{\n    \"name\": \"café\"\n}");
    }

    #[tokio::test]
    async fn test_fs_store_writes_nested_and_sets_mtime() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let path = Path::new("files/1_docs/1_readme.txt");

        store.write_bytes(path, b"hello").await.unwrap();
        store.set_mtime(path, 1_000_000_000).await;

        let full = dir.path().join(path);
        assert_eq!(std::fs::read(&full).unwrap(), b"hello");
        let modified = std::fs::metadata(&full).unwrap().modified().unwrap();
        assert_eq!(
            modified
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap()
                .as_secs(),
            1_000_000_000
        );
        assert!(store.exists(Path::new("files/1_docs")).await);
    }

    #[tokio::test]
    async fn test_fs_store_set_mtime_missing_file_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        store.set_mtime(Path::new("nope.json"), 1).await;
        store.set_mtime(Path::new("nope.json"), -5).await;
    }

    #[tokio::test]
    async fn test_memory_store_tracks_files_dirs_and_mtimes() {
        let store = MemoryStore::new();
        let written = store
            .write_json(Path::new("polls/1-7.json"), &json!({"surveyId": 7}))
            .await
            .unwrap();
        assert!(written > 0);
        store.set_mtime(Path::new("polls/1-7.json"), 42).await;

        assert!(store.is_dir("polls"));
        assert_eq!(store.json("polls/1-7.json").unwrap()["surveyId"], 7);
        assert_eq!(store.mtime("polls/1-7.json"), Some(42));
        assert!(store.exists(Path::new("polls")).await);
        assert!(!store.exists(Path::new("links")).await);
    }
}
