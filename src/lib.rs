//! viewcache - a view-template cache and renderer with atomic hot reload.
//!
//! Templates under a root directory are compiled into an immutable snapshot
//! on first use. Renders read the published snapshot without locking; a
//! reload builds a complete new snapshot and swaps it in, so a render never
//! sees a half-built cache or mixes two generations.
//!
//! ```no_run
//! use std::sync::Arc;
//! use viewcache::{DiskSource, JinjaEngine, Renderer, TemplateStore};
//!
//! let store = TemplateStore::new("views", Arc::new(DiskSource::new()), JinjaEngine::default());
//! let renderer = Renderer::new(store);
//! let html = renderer.render("home.html", serde_json::json!({ "name": "Ada" }))?;
//! # Ok::<(), viewcache::RenderError>(())
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logger;
pub mod minify;
pub mod reload;
pub mod render;
pub mod resolve;
pub mod source;
pub mod store;

pub use config::{ConfigError, ViewConfig};
pub use engine::{EngineError, JinjaEngine, JinjaOptions, Model, TemplateEngine};
pub use error::{LoadError, RenderError};
pub use minify::{HtmlMinifier, Minifier};
pub use reload::{ReloadCoordinator, ReloadError, ReloadReport};
pub use render::Renderer;
pub use resolve::IncludeResolver;
pub use source::{DiskSource, FileSource, MemorySource, WatchPattern};
pub use store::{StoreState, TemplateName, TemplateSnapshot, TemplateStore};
