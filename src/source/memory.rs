use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::{ChangeKind, FileSource, SourceError, SourceEvent, WatchGuard, WatchPattern};

/// In-memory template tree.
///
/// Change notifications are only emitted by [`MemorySource::insert`] and
/// [`MemorySource::remove`], which makes reload timing fully controllable.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    watchers: RwLock<Vec<Subscriber>>,
}

#[derive(Debug)]
struct Subscriber {
    root: PathBuf,
    pattern: WatchPattern,
    tx: mpsc::UnboundedSender<SourceEvent>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file and notify subscribers.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        let path = path.into();
        let kind = match self.files.write().insert(path.clone(), content.into()) {
            Some(_) => ChangeKind::Modified,
            None => ChangeKind::Created,
        };
        self.notify(&path, kind);
    }

    /// Remove a file and notify subscribers.
    pub fn remove(&self, path: &Path) {
        if self.files.write().remove(path).is_some() {
            self.notify(path, ChangeKind::Removed);
        }
    }

    /// Replace a file without emitting a notification.
    pub fn insert_silent(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.write().insert(path.into(), content.into());
    }

    fn notify(&self, path: &Path, kind: ChangeKind) {
        let mut watchers = self.watchers.write();
        watchers.retain(|sub| !sub.tx.is_closed());
        for sub in watchers.iter() {
            if sub.pattern.matches(&sub.root, path) {
                let _ = sub.tx.send(SourceEvent::new(path, kind));
            }
        }
    }
}

impl FileSource for MemorySource {
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let files = self.files.read();
        let listed: Vec<_> = files
            .keys()
            .filter(|path| path.starts_with(root) && path.as_path() != root)
            .filter(|path| !is_hidden(root, path))
            .cloned()
            .collect();
        if listed.is_empty() {
            return Err(SourceError::RootNotFound(root.to_path_buf()));
        }
        Ok(listed)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn watch(
        &self,
        root: &Path,
        pattern: WatchPattern,
        tx: mpsc::UnboundedSender<SourceEvent>,
    ) -> Result<WatchGuard, SourceError> {
        self.watchers.write().push(Subscriber {
            root: root.to_path_buf(),
            pattern,
            tx,
        });
        Ok(WatchGuard::detached())
    }
}

/// Dot-prefixed file or directory below `root`, skipped like the disk walk does.
fn is_hidden(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root).is_ok_and(|rel| {
        rel.components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_and_read() {
        let source = MemorySource::new();
        source.insert("views/home.html", "home");
        source.insert("views/a/b.html", "b");
        source.insert("other/x.html", "x");

        let files = source.list_files(Path::new("views")).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("views/a/b.html"), PathBuf::from("views/home.html")]
        );
        assert_eq!(source.read(Path::new("views/home.html")).unwrap(), b"home");
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let source = MemorySource::new();
        source.insert_silent("views/home.html", "home");
        source.insert_silent("views/.draft.html", "draft");
        source.insert_silent("views/.git/x.html", "x");
        source.insert_silent("views/a/.b/c.html", "c");

        let files = source.list_files(Path::new("views")).unwrap();
        assert_eq!(files, vec![PathBuf::from("views/home.html")]);

        // A dotted root is still walked
        source.insert_silent(".views/page.html", "page");
        let files = source.list_files(Path::new(".views")).unwrap();
        assert_eq!(files, vec![PathBuf::from(".views/page.html")]);
    }

    #[test]
    fn test_missing_root() {
        let source = MemorySource::new();
        source.insert("other/x.html", "x");
        assert!(matches!(
            source.list_files(Path::new("views")),
            Err(SourceError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_notifications_follow_pattern() {
        let source = MemorySource::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _guard = source
            .watch(Path::new("views"), WatchPattern::default(), tx)
            .unwrap();

        source.insert("views/home.html", "v1");
        source.insert("views/home.html", "v2");
        source.insert("views/style.css", "body {}");
        source.remove(Path::new("views/home.html"));

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Created, ChangeKind::Modified, ChangeKind::Removed]
        );
    }
}
