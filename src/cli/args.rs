//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// viewcache template cache CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: viewcache.toml)
    #[arg(short = 'C', long, global = true, default_value = "viewcache.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Template root (overrides `templates.root`)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Minify template sources before compiling
    #[arg(short, long, global = true, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the cache once and list template names
    #[command(visible_alias = "c")]
    Check,

    /// Render one template and print it
    #[command(visible_alias = "r")]
    Render {
        #[command(flatten)]
        args: RenderArgs,
    },

    /// Render one template and re-render after every reload
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        args: RenderArgs,
    },
}

/// Shared arguments for Render and Watch.
#[derive(clap::Args, Debug, Clone)]
pub struct RenderArgs {
    /// Template name relative to the root, e.g. `pages/home.html`
    #[arg(value_name = "NAME")]
    pub name: String,

    /// JSON file used as the model (default: null)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub model: Option<PathBuf>,
}
