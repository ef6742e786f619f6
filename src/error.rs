//! Build-time and call-time error types.
//!
//! | Type          | Raised by                   | Effect on the cache            |
//! |---------------|-----------------------------|--------------------------------|
//! | `LoadError`   | `TemplateStore::rebuild`    | none, last snapshot stays live |
//! | `RenderError` | `Renderer::render`          | none                           |

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;
use crate::source::SourceError;
use crate::store::TemplateName;

/// A rebuild attempt failed as a whole.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("template root `{0}` not found")]
    RootNotFound(PathBuf),

    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("template `{0}` is not valid UTF-8")]
    Encoding(PathBuf),

    #[error("failed to compile `{name}`: {source}")]
    Compile {
        name: TemplateName,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Source(SourceError),
}

impl From<SourceError> for LoadError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::RootNotFound(path) => Self::RootNotFound(path),
            other => Self::Source(other),
        }
    }
}

/// A single render call failed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{0}` not found")]
    TemplateNotFound(TemplateName),

    #[error("failed to render `{name}`: {source}")]
    Render {
        name: TemplateName,
        #[source]
        source: EngineError,
    },

    #[error("failed to load templates")]
    Load(#[from] LoadError),

    #[error("model is not serializable")]
    Model(#[from] serde_json::Error),
}

impl RenderError {
    /// Name of the template the caller asked for, when known.
    pub fn template(&self) -> Option<&TemplateName> {
        match self {
            Self::TemplateNotFound(name) | Self::Render { name, .. } => Some(name),
            Self::Load(_) | Self::Model(_) => None,
        }
    }
}
