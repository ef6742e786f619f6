//! Include resolution bound to one snapshot.
//!
//! A render captures the snapshot current at its start and resolves every
//! nested include through it, so a reload published mid-render never mixes
//! generations inside one output.

use std::sync::Arc;

use crate::store::TemplateSnapshot;

pub struct IncludeResolver<C> {
    snapshot: Arc<TemplateSnapshot<C>>,
}

impl<C> IncludeResolver<C> {
    pub fn new(snapshot: Arc<TemplateSnapshot<C>>) -> Self {
        Self { snapshot }
    }

    /// Look up an included template by name. Names are normalized the same
    /// way as store keys, so `./partials//nav.html` finds `partials/nav.html`.
    pub fn resolve(&self, name: &str) -> Option<&C> {
        self.snapshot.get(name)
    }

    /// Generation of the bound snapshot.
    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }

    pub fn snapshot(&self) -> &Arc<TemplateSnapshot<C>> {
        &self.snapshot
    }
}

impl<C> Clone for IncludeResolver<C> {
    fn clone(&self) -> Self {
        Self {
            snapshot: Arc::clone(&self.snapshot),
        }
    }
}

impl<C> std::fmt::Debug for IncludeResolver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncludeResolver")
            .field("generation", &self.snapshot.generation())
            .field("templates", &self.snapshot.len())
            .finish()
    }
}
