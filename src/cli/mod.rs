//! CLI entry points: `check`, `render`, `watch`.

mod args;

pub use args::{Cli, Commands, RenderArgs};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::ViewConfig;
use crate::engine::Model;
use crate::logger::{status_error, status_success};
use crate::render::Renderer;
use crate::{debug, log};

/// Load `viewcache.toml` and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<ViewConfig> {
    let mut config = ViewConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut ViewConfig, cli: &Cli) {
    if let Some(root) = &cli.root {
        // Relative to the working directory, not the config file
        config.templates.root = root.clone();
        config.base_dir = PathBuf::new();
    }
    if let Some(minify) = cli.minify {
        config.templates.minify = minify;
    }
}

// ============================================================================
// check
// ============================================================================

/// Build the cache once and list every template name.
pub fn check(config: &ViewConfig) -> Result<()> {
    let mut config = config.clone();
    config.templates.watch = false;

    let renderer = Renderer::from_config(&config)?;
    let generation = renderer.warm()?;
    let names = renderer.names();

    for name in &names {
        println!("{name}");
    }
    log!(
        "check";
        "{} templates in {} (generation {})",
        names.len(),
        config.template_root().display(),
        generation
    );
    Ok(())
}

// ============================================================================
// render
// ============================================================================

/// Render one template to stdout.
pub fn render(config: &ViewConfig, args: &RenderArgs) -> Result<()> {
    let mut config = config.clone();
    config.templates.watch = false;

    let model = read_model(args.model.as_deref())?;
    let renderer = Renderer::from_config(&config)?;
    let output = renderer.render_value(&args.name, &model)?;
    print!("{output}");
    Ok(())
}

fn read_model(path: Option<&Path>) -> Result<Model> {
    let Some(path) = path else {
        return Ok(Model::Null);
    };
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

// ============================================================================
// watch
// ============================================================================

/// Render, then re-render after every reload until interrupted.
pub fn watch(config: &ViewConfig, args: &RenderArgs) -> Result<()> {
    let mut config = config.clone();
    config.templates.watch = true;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(watch_loop(&config, args))
}

async fn watch_loop(config: &ViewConfig, args: &RenderArgs) -> Result<()> {
    let renderer = Renderer::from_config(config)?;
    let Some(mut reports) = renderer.reloads() else {
        anyhow::bail!("reload coordinator did not start");
    };

    log!("watch"; "watching {} ({})", config.template_root().display(), config.templates.pattern);
    show(&renderer, args);

    while reports.changed().await.is_ok() {
        let report = reports.borrow_and_update().clone();
        debug!("watch"; "report {:?}", report);
        match &report.error {
            None => show(&renderer, args),
            Some(err) => status_error(
                &format!("reload failed, still serving generation {}", report.generation),
                err,
            ),
        }
    }
    Ok(())
}

/// Render and replace the status block with the result.
fn show(renderer: &Renderer, args: &RenderArgs) {
    // Re-read the model so edits to it show up with the next reload
    let result = read_model(args.model.as_deref()).and_then(|model| {
        renderer
            .render_with_generation(&args.name, &model)
            .map_err(Into::into)
    });

    match result {
        Ok((output, generation)) => status_success(&format!(
            "{} (generation {})\n{}",
            args.name,
            generation,
            output.trim_end()
        )),
        Err(err) => status_error(&format!("failed to render {}", args.name), &format!("{err:#}")),
    }
}
