use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::{ChangeKind, FileSource, SourceError, SourceEvent, WatchGuard, WatchPattern};

/// Template files on the local filesystem.
///
/// Hidden files and directories are skipped while listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSource;

impl DiskSource {
    pub fn new() -> Self {
        Self
    }
}

impl FileSource for DiskSource {
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>, SourceError> {
        if !root.is_dir() {
            return Err(SourceError::RootNotFound(root.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort(true) {
            let entry = entry.map_err(|e| {
                SourceError::Io(root.to_path_buf(), std::io::Error::other(e.to_string()))
            })?;
            if entry.file_type().is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn watch(
        &self,
        root: &Path,
        pattern: WatchPattern,
        tx: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<WatchGuard, SourceError> {
        if !root.is_dir() {
            return Err(SourceError::RootNotFound(root.to_path_buf()));
        }

        // notify reports canonical paths
        let watched_root = normalize_path(root);
        let filter_root = watched_root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    crate::log!("watch"; "notify error: {}", e);
                    return;
                }
            };
            let Some(kind) = ChangeKind::from_notify(&event.kind) else {
                return;
            };
            crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

            for path in event.paths {
                if !pattern.affects(&filter_root, &path) {
                    continue;
                }
                // Receiver gone means the coordinator shut down
                if tx.send(SourceEvent::new(path, kind)).is_err() {
                    return;
                }
            }
        })?;

        watcher.watch(&watched_root, RecursiveMode::Recursive)?;
        crate::debug!("watch"; "watching {}", watched_root.display());

        Ok(WatchGuard::new(watcher))
    }
}

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first, then falls back to joining relative paths
/// with the current directory.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_root() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("views");
        fs::create_dir_all(&root).unwrap();
        (dir, root)
    }

    #[test]
    fn test_list_files_recursive() {
        let (_dir, root) = make_root();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("home.html"), "home").unwrap();
        fs::write(root.join("a").join("b.html"), "b").unwrap();

        let files = DiskSource.list_files(&root).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains(&root.join("home.html")));
        assert!(files.contains(&root.join("a").join("b.html")));
    }

    #[test]
    fn test_list_files_skips_hidden() {
        let (_dir, root) = make_root();
        fs::write(root.join("home.html"), "home").unwrap();
        fs::write(root.join(".home.html.swp"), "swap").unwrap();

        let files = DiskSource.list_files(&root).unwrap();
        assert_eq!(files, vec![root.join("home.html")]);
    }

    #[test]
    fn test_list_files_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("views");
        assert!(matches!(
            DiskSource.list_files(&missing),
            Err(SourceError::RootNotFound(path)) if path == missing
        ));
    }

    #[test]
    fn test_read() {
        let (_dir, root) = make_root();
        let path = root.join("home.html");
        fs::write(&path, "<p>hi</p>").unwrap();
        assert_eq!(DiskSource.read(&path).unwrap(), b"<p>hi</p>");
    }

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
    }
}
