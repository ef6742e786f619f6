//! Template Engine: compiles sources into renderable units.
//!
//! The cache never looks inside a compiled unit; it only stores what
//! [`TemplateEngine::compile`] returns and hands it back to
//! [`TemplateEngine::render`] together with an [`IncludeResolver`] bound to
//! the snapshot the render started on.

mod jinja;

pub use jinja::{JinjaEngine, JinjaOptions, JinjaTemplate};

use thiserror::Error;

use crate::resolve::IncludeResolver;
use crate::store::TemplateName;

/// Caller-supplied data passed through to the engine.
pub type Model = serde_json::Value;

/// Error raised by an engine while compiling or rendering.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EngineError(Box<dyn std::error::Error + Send + Sync>);

impl EngineError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }

    /// Downcast to the engine's own error type.
    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

/// Compiles raw template text and renders compiled units.
pub trait TemplateEngine: Send + Sync + 'static {
    /// Immutable compiled form of one template.
    type Compiled: Send + Sync + 'static;

    fn compile(&self, name: &TemplateName, source: String) -> Result<Self::Compiled, EngineError>;

    /// Render `template` against `model`, resolving includes through
    /// `includes` only.
    fn render(
        &self,
        template: &Self::Compiled,
        model: &Model,
        includes: &IncludeResolver<Self::Compiled>,
    ) -> Result<String, EngineError>;
}
