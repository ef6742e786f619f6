//! Reload Coordinator: turns file changes into snapshot rebuilds.
//!
//! ```text
//! FileSource::watch ──► mpsc ──► Debouncer ──► spawn_blocking(store.rebuild)
//!                                    ▲                    │
//!                                    └─ drained after ────┘──► watch::Sender<ReloadReport>
//! ```
//!
//! Only one rebuild runs at a time. Changes that arrive while it runs stay in
//! the channel and are folded into a single trailing rebuild.

mod debouncer;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use self::debouncer::Debouncer;
use crate::engine::TemplateEngine;
use crate::source::{ChangeKind, SourceError, SourceEvent, WatchGuard, WatchPattern};
use crate::store::TemplateStore;
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("watching templates requires a running tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Outcome of the latest reload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    /// Generation published after the attempt (unchanged on failure).
    pub generation: u64,
    /// Number of rebuild attempts so far, `0` before the first one.
    pub attempt: u64,
    /// Number of distinct changed paths that triggered the attempt.
    pub changes: usize,
    /// Error message when the rebuild failed.
    pub error: Option<String>,
}

impl ReloadReport {
    fn initial(generation: u64) -> Self {
        Self {
            generation,
            attempt: 0,
            changes: 0,
            error: None,
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Background task keeping a store in sync with its file source.
///
/// Dropping the coordinator stops the task and the watcher.
pub struct ReloadCoordinator {
    task: JoinHandle<()>,
    guard: Mutex<Option<WatchGuard>>,
    reports: watch::Receiver<ReloadReport>,
}

impl ReloadCoordinator {
    /// Subscribe to `store`'s file source and start the reload task on the
    /// current tokio runtime.
    pub fn spawn<E: TemplateEngine>(
        store: Arc<TemplateStore<E>>,
        pattern: WatchPattern,
        debounce: Duration,
    ) -> Result<Self, ReloadError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ReloadError::NoRuntime)?;

        let (tx, rx) = mpsc::unbounded_channel();
        debug!("watch"; "watching {} ({})", store.root().display(), pattern.as_str());
        let guard = store.source().watch(store.root(), pattern, tx)?;

        let (report_tx, reports) = watch::channel(ReloadReport::initial(store.generation()));
        let task = runtime.spawn(run(store, rx, Debouncer::new(debounce), report_tx));

        Ok(Self {
            task,
            guard: Mutex::new(Some(guard)),
            reports,
        })
    }

    /// Receiver updated after every rebuild attempt.
    pub fn subscribe(&self) -> watch::Receiver<ReloadReport> {
        self.reports.clone()
    }

    /// Latest report without waiting.
    pub fn last_report(&self) -> ReloadReport {
        self.reports.borrow().clone()
    }

    /// Stop watching. A rebuild already running finishes in the background
    /// but nothing new is started.
    pub fn shutdown(&self) {
        self.task.abort();
        if self.guard.lock().take().is_some() {
            debug!("watch"; "stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ReloadCoordinator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("running", &self.is_running())
            .field("last_report", &*self.reports.borrow())
            .finish()
    }
}

// ============================================================================
// event loop
// ============================================================================

async fn run<E: TemplateEngine>(
    store: Arc<TemplateStore<E>>,
    mut rx: mpsc::UnboundedReceiver<SourceEvent>,
    mut debouncer: Debouncer,
    reports: watch::Sender<ReloadReport>,
) {
    let mut attempt = 0;

    loop {
        tokio::select! {
            biased;
            event = rx.recv() => match event {
                Some(event) => debouncer.add_event(event),
                None => break,
            },
            _ = tokio::time::sleep(debouncer.sleep_duration()), if debouncer.is_pending() => {
                let Some(changes) = debouncer.take_if_ready() else {
                    continue;
                };
                attempt += 1;
                let report = reload(&store, &changes, attempt).await;

                // Everything queued during the rebuild becomes one trailing window
                while let Ok(event) = rx.try_recv() {
                    debouncer.add_event(event);
                }
                reports.send_replace(report);
            }
        }
    }

    debug!("watch"; "change channel closed, reload task exiting");
}

async fn reload<E: TemplateEngine>(
    store: &Arc<TemplateStore<E>>,
    changes: &[(PathBuf, ChangeKind)],
    attempt: u64,
) -> ReloadReport {
    log_changes(changes);

    let task_store = Arc::clone(store);
    let result = tokio::task::spawn_blocking(move || {
        task_store.rebuild().map(|snapshot| snapshot.generation())
    })
    .await;

    let error = match result {
        Ok(Ok(generation)) => {
            log!("reload"; "generation {} ({} changed)", generation, changes.len());
            None
        }
        Ok(Err(err)) => {
            log!("error"; "reload failed: {}", err);
            Some(err.to_string())
        }
        Err(err) => {
            log!("error"; "reload task failed: {}", err);
            Some(err.to_string())
        }
    };

    ReloadReport {
        generation: store.generation(),
        attempt,
        changes: changes.len(),
        error,
    }
}

fn log_changes(changes: &[(PathBuf, ChangeKind)]) {
    for (path, kind) in changes {
        debug!("watch"; "{} {}", kind.label(), path.display());
    }
}
