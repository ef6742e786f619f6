//! Immutable cache versions.

use std::collections::BTreeMap;

use super::TemplateName;

/// One fully built generation of compiled templates.
///
/// Never mutated after construction; replaced as a whole on reload.
#[derive(Debug)]
pub struct TemplateSnapshot<C> {
    generation: u64,
    templates: BTreeMap<TemplateName, C>,
}

impl<C> TemplateSnapshot<C> {
    pub fn new(generation: u64, templates: BTreeMap<TemplateName, C>) -> Self {
        Self {
            generation,
            templates,
        }
    }

    /// Look up a template, normalizing `name` first.
    pub fn get(&self, name: &str) -> Option<&C> {
        self.templates.get(TemplateName::new(name).as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Template names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &TemplateName> {
        self.templates.keys()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
