//! Template Store: owns the published snapshot and rebuilds it.
//!
//! # Publication
//!
//! ```text
//! rebuild()                                   current()
//!    │                                           │
//!    ├─ list files ─► read ─► minify ─► compile  │  lock-free load
//!    │        (rayon, all-or-nothing)            │
//!    └─ ArcSwapOption::store(snapshot) ──────────┘
//! ```
//!
//! Readers never wait for a rebuild. Rebuilds are serialized by
//! `rebuild_lock`, which also owns the generation counter.

mod name;
mod snapshot;

pub use name::TemplateName;
pub use snapshot::TemplateSnapshot;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::engine::TemplateEngine;
use crate::error::LoadError;
use crate::minify::Minifier;
use crate::source::FileSource;
use crate::debug;

/// Observable lifecycle of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing published yet.
    Empty,
    /// A rebuild is running. The previous snapshot, if any, is still served.
    Loading,
    /// A snapshot is published and no rebuild is running.
    Ready,
}

pub struct TemplateStore<E: TemplateEngine> {
    root: PathBuf,
    source: Arc<dyn FileSource>,
    engine: E,
    minifier: Option<Arc<dyn Minifier>>,
    published: ArcSwapOption<TemplateSnapshot<E::Compiled>>,
    /// Held for the whole rebuild; guards the last issued generation.
    rebuild_lock: Mutex<u64>,
    loading: AtomicBool,
}

impl<E: TemplateEngine> TemplateStore<E> {
    pub fn new(root: impl Into<PathBuf>, source: Arc<dyn FileSource>, engine: E) -> Self {
        Self {
            root: root.into(),
            source,
            engine,
            minifier: None,
            published: ArcSwapOption::empty(),
            rebuild_lock: Mutex::new(0),
            loading: AtomicBool::new(false),
        }
    }

    /// Minify every source before it is compiled.
    pub fn with_minifier(mut self, minifier: Arc<dyn Minifier>) -> Self {
        self.minifier = Some(minifier);
        self
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn source(&self) -> &Arc<dyn FileSource> {
        &self.source
    }

    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Latest published snapshot, without waiting for a running rebuild.
    #[inline]
    pub fn current(&self) -> Option<Arc<TemplateSnapshot<E::Compiled>>> {
        self.published.load_full()
    }

    /// Latest published snapshot, building the first one if needed.
    ///
    /// Concurrent first callers wait for a single initial build.
    pub fn current_or_load(&self) -> Result<Arc<TemplateSnapshot<E::Compiled>>, LoadError> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        let mut last = self.rebuild_lock.lock();
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        self.rebuild_locked(&mut last)
    }

    /// Generation of the published snapshot, `0` before the first build.
    pub fn generation(&self) -> u64 {
        self.current().map_or(0, |s| s.generation())
    }

    pub fn state(&self) -> StoreState {
        if self.loading.load(Ordering::Acquire) {
            StoreState::Loading
        } else if self.published.load().is_some() {
            StoreState::Ready
        } else {
            StoreState::Empty
        }
    }

    // =========================================================================
    // Rebuild
    // =========================================================================

    /// Build a new snapshot from the file tree and publish it.
    ///
    /// On failure nothing is published and the previous snapshot stays live.
    pub fn rebuild(&self) -> Result<Arc<TemplateSnapshot<E::Compiled>>, LoadError> {
        let mut last = self.rebuild_lock.lock();
        self.rebuild_locked(&mut last)
    }

    fn rebuild_locked(
        &self,
        last: &mut u64,
    ) -> Result<Arc<TemplateSnapshot<E::Compiled>>, LoadError> {
        let _loading = LoadingFlag::set(&self.loading);
        let start = Instant::now();

        let templates = match self.build() {
            Ok(templates) => templates,
            Err(err) => {
                debug!("store"; "rebuild failed, keeping generation {}: {}", *last, err);
                return Err(err);
            }
        };

        *last += 1;
        let snapshot = Arc::new(TemplateSnapshot::new(*last, templates));
        self.published.store(Some(Arc::clone(&snapshot)));

        debug!(
            "store";
            "generation {} with {} templates in {:.1?}",
            snapshot.generation(),
            snapshot.len(),
            start.elapsed()
        );
        Ok(snapshot)
    }

    fn build(&self) -> Result<BTreeMap<TemplateName, E::Compiled>, LoadError> {
        let files = self.source.list_files(&self.root)?;

        let entries: Vec<(TemplateName, PathBuf)> = files
            .into_iter()
            .filter_map(|path| TemplateName::from_path(&self.root, &path).map(|name| (name, path)))
            .collect();

        let compiled = entries
            .into_par_iter()
            .map(|(name, path)| self.load_one(name, &path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(compiled.into_iter().collect())
    }

    /// Read, minify and compile one file.
    fn load_one(
        &self,
        name: TemplateName,
        path: &Path,
    ) -> Result<(TemplateName, E::Compiled), LoadError> {
        let raw = self
            .source
            .read(path)
            .map_err(|err| LoadError::Io(path.to_path_buf(), err))?;

        if std::str::from_utf8(&raw).is_err() {
            return Err(LoadError::Encoding(path.to_path_buf()));
        }

        let bytes = match &self.minifier {
            Some(minifier) => minifier.minify(&raw),
            None => raw,
        };
        let text = String::from_utf8(bytes).map_err(|_| LoadError::Encoding(path.to_path_buf()))?;

        let compiled = self
            .engine
            .compile(&name, text)
            .map_err(|source| LoadError::Compile {
                name: name.clone(),
                source,
            })?;
        Ok((name, compiled))
    }
}

/// Marks a store as loading until dropped.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
