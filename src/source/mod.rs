//! File Source: where template files come from.
//!
//! The store only needs three things from the file tree: a recursive listing,
//! byte reads, and change notifications scoped to a glob.
//!
//! | Implementation | Listing / reads     | Change notifications        |
//! |----------------|---------------------|-----------------------------|
//! | `DiskSource`   | `jwalk` + `std::fs` | `notify` recommended watcher |
//! | `MemorySource` | in-memory map       | explicit `insert` / `remove` |

mod disk;
mod memory;

pub use disk::DiskSource;
pub use memory::MemorySource;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::store::TemplateName;

/// Errors raised by a file source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("template root `{0}` not found")]
    RootNotFound(PathBuf),

    #[error("IO error when listing `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to watch template root")]
    Watch(#[from] notify::Error),

    #[error("invalid watch pattern `{0}`")]
    Pattern(String, #[source] glob::PatternError),
}

/// Access to a tree of template files.
pub trait FileSource: Send + Sync + 'static {
    /// All files below `root`, recursively.
    ///
    /// Fails with [`SourceError::RootNotFound`] when `root` is not a directory.
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>, SourceError>;

    /// Read one file completely.
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// Subscribe to changes of files under `root` matching `pattern`.
    ///
    /// Events are sent until the returned guard is dropped.
    fn watch(
        &self,
        root: &Path,
        pattern: WatchPattern,
        tx: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<WatchGuard, SourceError>;
}

// =============================================================================
// Events
// =============================================================================

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }

    /// Map a notify event kind, ignoring access and metadata-only noise.
    pub fn from_notify(kind: &notify::EventKind) -> Option<Self> {
        use notify::EventKind;
        use notify::event::ModifyKind;

        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Remove(_) => Some(Self::Removed),
            // mtime/atime/chmod changes would otherwise loop rebuilds
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            _ => None,
        }
    }
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl SourceEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

// =============================================================================
// Watch pattern
// =============================================================================

/// Glob matched against template names (paths relative to the root).
#[derive(Debug, Clone)]
pub struct WatchPattern {
    pattern: glob::Pattern,
}

impl WatchPattern {
    pub fn new(pattern: &str) -> Result<Self, SourceError> {
        glob::Pattern::new(pattern)
            .map(|pattern| Self { pattern })
            .map_err(|e| SourceError::Pattern(pattern.to_string(), e))
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Check whether `path` lies under `root` and matches the glob.
    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        let Some(name) = TemplateName::from_path(root, path) else {
            return false;
        };
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.pattern.matches_with(name.as_str(), options)
    }

    /// Check whether a change at `path` on disk can affect templates under
    /// `root`.
    ///
    /// Besides matching files this accepts directories below the root, and
    /// extension-less paths that no longer exist: renaming or removing a
    /// directory is reported for the directory only, not for the files in it.
    pub fn affects(&self, root: &Path, path: &Path) -> bool {
        if self.matches(root, path) {
            return true;
        }
        if TemplateName::from_path(root, path).is_none() {
            return false;
        }
        path.is_dir() || (path.extension().is_none() && !path.exists())
    }
}

impl Default for WatchPattern {
    fn default() -> Self {
        Self {
            pattern: glob::Pattern::new(DEFAULT_WATCH_PATTERN)
                .expect("default watch pattern is a valid glob"),
        }
    }
}

pub const DEFAULT_WATCH_PATTERN: &str = "**/*.html";

/// Keeps a subscription alive; dropping it stops notifications.
pub struct WatchGuard {
    _inner: Option<Box<dyn Send>>,
}

impl WatchGuard {
    pub fn new(inner: impl Send + 'static) -> Self {
        Self {
            _inner: Some(Box::new(inner)),
        }
    }

    /// Guard for sources whose notifications need no backing resource.
    pub fn detached() -> Self {
        Self { _inner: None }
    }
}

impl std::fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchGuard").finish_non_exhaustive()
    }
}
