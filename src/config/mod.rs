//! Configuration management for `viewcache.toml`.
//!
//! # Example
//!
//! ```toml
//! [templates]
//! root = "views"            # Template root, relative to this file
//! minify = false            # Minify template sources before compiling
//! watch = false             # Reload when files under root change
//! pattern = "**/*.html"     # Files whose changes trigger a reload
//! debounce_ms = 300         # Quiet period before a reload starts
//! strict = false            # Undefined variables are render errors
//! max_include_depth = 32    # Nesting limit for include()
//! ```
//!
//! A missing config file is not an error: every field has a default.

mod error;

pub use error::ConfigError;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::JinjaOptions;
use crate::log;
use crate::source::{DEFAULT_WATCH_PATTERN, WatchPattern};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing viewcache.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths are resolved against (internal use only)
    #[serde(skip)]
    pub base_dir: PathBuf,

    /// Template settings
    #[serde(default)]
    pub templates: TemplatesConfig,
}

/// `[templates]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Template root directory.
    pub root: PathBuf,

    /// Minify template sources before compiling.
    pub minify: bool,

    /// Enable the file watcher.
    pub watch: bool,

    /// Glob (relative to root) of files whose changes trigger a reload.
    pub pattern: String,

    /// Quiet period in milliseconds before a reload starts.
    pub debounce_ms: u64,

    /// Treat undefined variables as render errors.
    pub strict: bool,

    /// Maximum nesting of `include(...)` calls.
    pub max_include_depth: usize,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("views"),
            minify: false,
            watch: false,
            pattern: DEFAULT_WATCH_PATTERN.to_string(),
            debounce_ms: 300,
            strict: false,
            max_include_depth: 32,
        }
    }
}

impl ViewConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// Relative template roots are resolved against the config file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_path(path)?
        } else {
            crate::debug!("config"; "{} not found, using defaults", path.display());
            Self::default()
        };

        config.config_path = path.to_path_buf();
        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let (config, _) = Self::parse_with_ignored(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        log!("warning"; "unknown fields in {}, ignoring: {}", path.display(), fields.join(", "));
    }

    /// Validate field values that serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let templates = &self.templates;
        if templates.root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "templates.root must not be empty".into(),
            ));
        }
        if templates.max_include_depth == 0 {
            return Err(ConfigError::Validation(
                "templates.max_include_depth must be at least 1".into(),
            ));
        }
        WatchPattern::new(&templates.pattern)
            .map_err(|e| ConfigError::Validation(format!("templates.pattern: {e}")))?;
        Ok(())
    }

    /// Template root as an absolute-or-cwd-relative path.
    pub fn template_root(&self) -> PathBuf {
        if self.templates.root.is_absolute() || self.base_dir.as_os_str().is_empty() {
            self.templates.root.clone()
        } else {
            self.base_dir.join(&self.templates.root)
        }
    }

    pub fn watch_pattern(&self) -> WatchPattern {
        WatchPattern::new(&self.templates.pattern).unwrap_or_default()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.templates.debounce_ms)
    }

    pub fn engine_options(&self) -> JinjaOptions {
        JinjaOptions {
            strict: self.templates.strict,
            max_include_depth: self.templates.max_include_depth,
        }
    }
}

/// Parse a test configuration, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ViewConfig {
    let (parsed, ignored) = ViewConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.templates.root, PathBuf::from("views"));
        assert!(!config.templates.minify);
        assert!(!config.templates.watch);
        assert_eq!(config.templates.pattern, "**/*.html");
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.templates.max_include_depth, 32);
    }

    #[test]
    fn test_partial_override() {
        let config = test_parse_config("[templates]\nminify = true\nwatch = true");
        assert!(config.templates.minify);
        assert!(config.templates.watch);
        // root keeps its default
        assert_eq!(config.templates.root, PathBuf::from("views"));
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) =
            ViewConfig::parse_with_ignored("[templates]\nminfy = true\n").unwrap();
        assert_eq!(ignored, vec!["templates.minfy".to_string()]);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            ViewConfig::from_str("[templates]\nmax_include_depth = 0"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            ViewConfig::from_str("[templates]\npattern = \"[oops\""),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            ViewConfig::from_str("[templates]\nroot = \"\""),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            ViewConfig::from_str("[templates\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_load_resolves_root_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("viewcache.toml");
        fs::write(&path, "[templates]\nroot = \"templates\"\nstrict = true\n").unwrap();

        let config = ViewConfig::load(&path).unwrap();
        assert_eq!(config.template_root(), dir.path().join("templates"));
        assert!(config.engine_options().strict);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("viewcache.toml");

        let config = ViewConfig::load(&path).unwrap();
        assert_eq!(config.template_root(), dir.path().join("views"));
    }
}
