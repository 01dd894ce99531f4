//! CLI command implementations

pub mod ask;
pub mod chat;
pub mod finetune;
pub mod info;
pub mod tokens;

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::index::{self, CollectOptions, SourceFile};
use crate::ui;

/// Where to load files from, as given on the command line
#[derive(Debug, Clone, clap::Args)]
pub struct SourceArgs {
    /// Base directory holding .gitignore (defaults to current directory)
    #[arg(default_value = ".")]
    pub base_dir: String,

    /// Directory to load files from (defaults to the base directory)
    pub target_dir: Option<String>,

    /// Glob matched against file names (overrides [files].pattern)
    pub pattern: Option<String>,
}

/// Load source files with a spinner
pub fn load_sources(config: &Config, args: &SourceArgs) -> Result<Vec<SourceFile>> {
    let mut options = CollectOptions::from(config.files.clone());
    if let Some(pattern) = &args.pattern {
        options.pattern = pattern.clone();
    }

    let base_dir = Path::new(&args.base_dir);
    let target_dir = args.target_dir.as_deref().map(Path::new).unwrap_or(base_dir);

    let pb = ui::spinner("Scanning codebase...");
    let sources = index::collect_sources(base_dir, target_dir, &options);
    pb.finish_and_clear();

    let sources = sources?;
    tracing::info!(files = sources.len(), "loaded source files");
    Ok(sources)
}
