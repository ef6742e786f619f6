//! Renderer: the public entry point.
//!
//! ```text
//! render(name, model)
//!   ├─ store.current_or_load()     first call builds, later calls are a pointer load
//!   ├─ snapshot.get(name)          TemplateNotFound when absent
//!   └─ engine.render(..)           includes resolved against the same snapshot
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::config::ViewConfig;
use crate::engine::{JinjaEngine, Model, TemplateEngine};
use crate::error::{LoadError, RenderError};
use crate::minify::HtmlMinifier;
use crate::reload::{ReloadCoordinator, ReloadError, ReloadReport};
use crate::resolve::IncludeResolver;
use crate::source::{DiskSource, WatchPattern};
use crate::store::{TemplateName, TemplateStore};

pub struct Renderer<E: TemplateEngine = JinjaEngine> {
    store: Arc<TemplateStore<E>>,
    coordinator: Option<ReloadCoordinator>,
}

impl<E: TemplateEngine> Renderer<E> {
    /// Renderer without file watching. Nothing is loaded until the first
    /// render or [`Renderer::warm`].
    pub fn new(store: TemplateStore<E>) -> Self {
        Self::from_store(Arc::new(store))
    }

    pub fn from_store(store: Arc<TemplateStore<E>>) -> Self {
        Self {
            store,
            coordinator: None,
        }
    }

    /// Start reloading the store whenever files matching `pattern` change.
    ///
    /// Must be called inside a tokio runtime.
    pub fn watch(mut self, pattern: WatchPattern, debounce: Duration) -> Result<Self, ReloadError> {
        let coordinator = ReloadCoordinator::spawn(Arc::clone(&self.store), pattern, debounce)?;
        self.coordinator = Some(coordinator);
        Ok(self)
    }

    /// Render `name` with any serializable model.
    pub fn render(&self, name: &str, model: impl Serialize) -> Result<String, RenderError> {
        let model = serde_json::to_value(model)?;
        self.render_value(name, &model)
    }

    pub fn render_value(&self, name: &str, model: &Model) -> Result<String, RenderError> {
        self.render_with_generation(name, model).map(|(output, _)| output)
    }

    /// Render and report the generation of the snapshot that produced the
    /// output. A reload landing mid-render does not change the answer.
    pub fn render_with_generation(
        &self,
        name: &str,
        model: &Model,
    ) -> Result<(String, u64), RenderError> {
        let snapshot = self.store.current_or_load()?;
        let name = TemplateName::new(name);

        let Some(template) = snapshot.get(name.as_str()) else {
            return Err(RenderError::TemplateNotFound(name));
        };

        let includes = IncludeResolver::new(Arc::clone(&snapshot));
        let output = self
            .store
            .engine()
            .render(template, model, &includes)
            .map_err(|source| RenderError::Render { name, source })?;
        Ok((output, snapshot.generation()))
    }

    /// Build the cache now instead of on first render.
    ///
    /// Returns the generation now being served.
    pub fn warm(&self) -> Result<u64, LoadError> {
        self.store.current_or_load().map(|snapshot| snapshot.generation())
    }

    /// Names in the currently published snapshot; empty before the first load.
    pub fn names(&self) -> Vec<TemplateName> {
        self.store
            .current()
            .map(|snapshot| snapshot.names().cloned().collect())
            .unwrap_or_default()
    }

    #[inline]
    pub fn store(&self) -> &Arc<TemplateStore<E>> {
        &self.store
    }

    /// Reload reports, when watching.
    pub fn reloads(&self) -> Option<watch::Receiver<ReloadReport>> {
        self.coordinator.as_ref().map(ReloadCoordinator::subscribe)
    }

    /// Stop watching; rendering keeps working on the last snapshot.
    pub fn stop_watching(&mut self) {
        if let Some(coordinator) = self.coordinator.take() {
            coordinator.shutdown();
        }
    }
}

impl Renderer<JinjaEngine> {
    /// Wire a disk-backed renderer from `viewcache.toml` settings.
    pub fn from_config(config: &ViewConfig) -> Result<Self, ReloadError> {
        let templates = &config.templates;
        let mut store = TemplateStore::new(
            config.template_root(),
            Arc::new(DiskSource::new()),
            JinjaEngine::new(config.engine_options()),
        );
        if templates.minify {
            store = store.with_minifier(Arc::new(HtmlMinifier::new()));
        }

        let renderer = Self::new(store);
        if templates.watch {
            renderer.watch(config.watch_pattern(), config.debounce())
        } else {
            Ok(renderer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::source::MemorySource;
    use crate::store::StoreState;
    use serde_json::json;
    use tempfile::TempDir;

    fn renderer(files: &[(&str, &str)]) -> (Arc<MemorySource>, Renderer) {
        let source = Arc::new(MemorySource::new());
        for (path, content) in files {
            source.insert_silent(*path, *content);
        }
        let store = TemplateStore::new("views", source.clone(), JinjaEngine::default());
        (source, Renderer::new(store))
    }

    #[test]
    fn test_layout_include() {
        let (_, renderer) = renderer(&[
            ("views/layout.html", "<html>{{ content }}</html>"),
            (
                "views/home.html",
                "{% set body %}Hi {{ model.name }}{% endset %}{{ include(\"layout.html\", content=body) }}",
            ),
        ]);
        let out = renderer.render("home.html", json!({ "name": "Ada" })).unwrap();
        assert_eq!(out, "<html>Hi Ada</html>");
    }

    #[test]
    fn test_render_serializable_model() {
        #[derive(Serialize)]
        struct User<'a> {
            name: &'a str,
            admin: bool,
        }

        let (_, renderer) = renderer(&[(
            "views/user.html",
            "{{ model.name }}{% if model.admin %} (admin){% endif %}",
        )]);
        let out = renderer
            .render("user.html", User { name: "Ada", admin: true })
            .unwrap();
        assert_eq!(out, "Ada (admin)");
    }

    #[test]
    fn test_missing_template_leaves_cache_untouched() {
        let (_, renderer) = renderer(&[("views/home.html", "home")]);
        renderer.warm().unwrap();
        let before = renderer.store().current().unwrap();

        let err = renderer.render("missing.html", json!({})).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(ref name) if name == "missing.html"));

        let after = renderer.store().current().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(renderer.store().generation(), 1);
    }

    #[test]
    fn test_render_error_names_template() {
        let (_, renderer) = renderer(&[("views/page.html", "{{ include('gone.html') }}")]);
        let err = renderer.render("page.html", json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Render { ref name, .. } if name == "page.html"));
        assert!(err.to_string().contains("gone.html"));
    }

    #[test]
    fn test_idempotent() {
        let (_, renderer) = renderer(&[("views/home.html", "Hi {{ model.name }}")]);
        let model = json!({ "name": "Ada" });
        let first = renderer.render("home.html", &model).unwrap();
        let second = renderer.render("home.html", &model).unwrap();
        assert_eq!(first, second);
        assert_eq!(renderer.store().generation(), 1);
    }

    #[test]
    fn test_generation_matches_rendered_snapshot() {
        let (source, renderer) = renderer(&[("views/home.html", "v1")]);
        let (out, generation) = renderer.render_with_generation("home.html", &Model::Null).unwrap();
        assert_eq!((out.as_str(), generation), ("v1", 1));

        source.insert_silent("views/home.html", "v2");
        renderer.store().rebuild().unwrap();
        let (out, generation) = renderer.render_with_generation("home.html", &Model::Null).unwrap();
        assert_eq!((out.as_str(), generation), ("v2", 2));
    }

    #[test]
    fn test_lazy_population() {
        let (_, renderer) = renderer(&[("views/home.html", "home")]);
        assert_eq!(renderer.store().state(), StoreState::Empty);
        assert!(renderer.names().is_empty());

        renderer.render("home.html", Model::Null).unwrap();
        assert_eq!(renderer.store().state(), StoreState::Ready);
        assert_eq!(renderer.names(), vec![TemplateName::new("home.html")]);
    }

    #[test]
    fn test_name_normalization() {
        let (_, renderer) = renderer(&[("views/partials/nav.html", "nav")]);
        assert_eq!(renderer.render("/partials/nav.html", Model::Null).unwrap(), "nav");
        assert_eq!(renderer.render("partials\\nav.html", Model::Null).unwrap(), "nav");
    }

    #[test]
    fn test_load_failure_surfaces() {
        let (_, renderer) = renderer(&[("elsewhere/home.html", "home")]);
        let err = renderer.render("home.html", Model::Null).unwrap_err();
        assert!(matches!(err, RenderError::Load(LoadError::RootNotFound(_))));
        assert_eq!(renderer.store().state(), StoreState::Empty);
    }

    #[test]
    fn test_consistent_output_during_reloads() {
        let (source, renderer) = renderer(&[
            ("views/page.html", "{{ include('a.html') }}{{ include('b.html') }}"),
            ("views/a.html", "1"),
            ("views/b.html", "1"),
        ]);
        let renderer = Arc::new(renderer);
        renderer.warm().unwrap();

        let writer = {
            let renderer = Arc::clone(&renderer);
            std::thread::spawn(move || {
                for i in 2..20 {
                    source.insert_silent("views/a.html", i.to_string());
                    source.insert_silent("views/b.html", i.to_string());
                    renderer.store().rebuild().unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let renderer = Arc::clone(&renderer);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let out = renderer.render("page.html", Model::Null).unwrap();
                        let (a, b) = out.split_at(out.len() / 2);
                        assert_eq!(a, b, "mixed generations in `{out}`");
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_edit_visible_after_reload() {
        let (source, renderer) = renderer(&[("views/home.html", "old")]);
        let renderer = renderer
            .watch(WatchPattern::default(), Duration::from_millis(10))
            .unwrap();
        let mut reports = renderer.reloads().unwrap();
        assert_eq!(renderer.render("home.html", Model::Null).unwrap(), "old");

        source.insert("views/home.html", "new");
        // Until the reload lands the old content is served
        if reports.borrow().attempt == 0 {
            assert_eq!(renderer.render("home.html", Model::Null).unwrap(), "old");
        }

        tokio::time::timeout(Duration::from_secs(10), reports.wait_for(|r| r.attempt >= 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renderer.render("home.html", Model::Null).unwrap(), "new");
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("views");
        std::fs::create_dir_all(root.join("partials")).unwrap();
        std::fs::write(root.join("partials/item.html"), "<b>{{ item }}</b>").unwrap();
        std::fs::write(
            root.join("list.html"),
            "<ul>\n  <li>a</li>\n  <li>{{ include('partials/item.html', item=model.x) }}</li>\n</ul>\n",
        )
        .unwrap();

        let mut config = test_parse_config("[templates]\nminify = true\n");
        config.base_dir = dir.path().to_path_buf();

        let renderer = Renderer::from_config(&config).unwrap();
        let out = renderer.render("list.html", json!({ "x": "b" })).unwrap();
        assert_eq!(out, "<ul><li>a</li><li><b>b</b></li></ul>");
    }
}
