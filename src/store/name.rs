//! Logical template names.
//!
//! - Cache key of a snapshot and key of `include(...)` references
//! - Always `/`-separated, never starts with `/`, no `.` or empty segments

use std::borrow::Borrow;
use std::path::{Component, Path};
use std::sync::Arc;

/// Forward-slash relative path of a template below the template root.
///
/// Invariants:
/// - Segments are separated by `/`, whatever the host separator is
/// - No leading `/`, no empty or `.` segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateName(Arc<str>);

impl TemplateName {
    /// Normalize a name as written by a caller or an include reference.
    ///
    /// `\` is treated as a separator, so `partials\nav.html` and
    /// `/partials/nav.html` both become `partials/nav.html`.
    pub fn new(raw: &str) -> Self {
        let joined = raw
            .trim()
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(Arc::from(joined))
    }

    /// Derive the name of `path` relative to `root`.
    ///
    /// Returns `None` when `path` is not below `root`, is the root itself,
    /// or contains components that cannot be part of a name (`..`, prefixes,
    /// non UTF-8 segments).
    pub fn from_path(root: &Path, path: &Path) -> Option<Self> {
        let relative = path.strip_prefix(root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if segments.is_empty() {
            return None;
        }
        Some(Self::new(&segments.join("/")))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TemplateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TemplateName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TemplateName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TemplateName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl PartialEq<str> for TemplateName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for TemplateName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}
