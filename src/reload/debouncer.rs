use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::source::{ChangeKind, SourceEvent};

/// Idle sleep when nothing is pending.
const IDLE: Duration = Duration::from_secs(86400);

/// Pure debouncer: only handles timing and event deduplication.
pub(super) struct Debouncer {
    window: Duration,
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            changes: FxHashMap::default(),
            last_event: None,
        }
    }

    /// Add a change, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Create/Modify + Remove → Remove (file was deleted)
    /// - otherwise the first event wins
    ///
    /// A path is never dropped once seen: every reload rescans the whole
    /// tree, and the published snapshot may still hold a file whose events
    /// cancel out within one window.
    pub(super) fn add_event(&mut self, event: SourceEvent) {
        let SourceEvent { path, kind } = event;
        if is_temp_file(&path) {
            crate::debug!("watch"; "skip temp file: {}", path.display());
            return;
        }

        self.last_event = Some(Instant::now());

        let Some(&existing) = self.changes.get(&path) else {
            crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
            self.changes.insert(path, kind);
            return;
        };

        match (existing, kind) {
            (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                crate::debug!("watch"; "restore {}->{}: {}", existing.label(), kind.label(), path.display());
                self.changes.insert(path, kind);
            }
            (ChangeKind::Created | ChangeKind::Modified, ChangeKind::Removed) => {
                crate::debug!("watch"; "upgrade {}->removed: {}", existing.label(), path.display());
                self.changes.insert(path, ChangeKind::Removed);
            }
            _ => {}
        }
    }

    /// Take the pending changes once the quiet window has elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<Vec<(PathBuf, ChangeKind)>> {
        let last_event = self.last_event?;
        if last_event.elapsed() < self.window {
            return None;
        }

        self.last_event = None;
        if self.changes.is_empty() {
            return None;
        }

        let mut changes: Vec<_> = std::mem::take(&mut self.changes).into_iter().collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        Some(changes)
    }

    pub(super) fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// Time left until the current window closes.
    pub(super) fn sleep_duration(&self) -> Duration {
        match self.last_event {
            Some(last_event) => self.window.saturating_sub(last_event.elapsed()),
            None => IDLE,
        }
    }
}

/// Check if path is a temp/backup file (editor artifacts).
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
