//! Source file discovery
//!
//! Walks a directory and loads every file that survives `.gitignore`, the
//! configured ignore patterns and the file-name glob.

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::FilesConfig;

/// A loaded source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the base directory
    pub path: PathBuf,
    pub body: String,
}

impl SourceFile {
    pub fn new(path: PathBuf, body: impl Into<String>) -> Self {
        Self {
            path,
            body: body.into(),
        }
    }
}

/// What to keep while walking
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub pattern: String,
    pub ignore_patterns: Vec<String>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        FilesConfig::default().into()
    }
}

impl From<FilesConfig> for CollectOptions {
    fn from(files: FilesConfig) -> Self {
        Self {
            pattern: files.pattern,
            ignore_patterns: files.ignore_patterns,
        }
    }
}

/// Load the source files under `target_dir`.
///
/// Ignore rules are resolved against `base_dir`: its `.gitignore` (if any)
/// plus `options.ignore_patterns`. Paths whose location relative to
/// `base_dir` starts with `.` are skipped. Results are sorted by path.
pub fn collect_sources(base_dir: &Path, target_dir: &Path, options: &CollectOptions) -> Result<Vec<SourceFile>> {
    let base_dir = base_dir
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", base_dir.display()))?;
    let target_dir = target_dir
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", target_dir.display()))?;

    let ignore = build_ignore(&base_dir, &options.ignore_patterns)?;
    let matcher = file_matcher(&options.pattern)?;
    let mut sources = Vec::new();

    let walker = WalkDir::new(&target_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.path() == target_dir {
                return true;
            }
            !is_excluded(&base_dir, &ignore, e.path(), e.file_type().is_dir())
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !matcher.is_match(file_name.as_ref()) {
            debug!(path = %entry.path().display(), "skipped: name does not match pattern");
            continue;
        }

        match read_source(entry.path()) {
            Ok(body) => {
                let relative = entry
                    .path()
                    .strip_prefix(&base_dir)
                    .unwrap_or(entry.path())
                    .to_path_buf();
                debug!(path = %relative.display(), "loaded source file");
                sources.push(SourceFile::new(relative, body));
            }
            Err(e) => warn!(path = %entry.path().display(), "skipped: {:#}", e),
        }
    }

    Ok(sources)
}

/// Read one file as UTF-8 text.
pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

fn build_ignore(base_dir: &Path, patterns: &[String]) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(base_dir);

    let gitignore_path = base_dir.join(".gitignore");
    if gitignore_path.exists() {
        if let Some(err) = builder.add(&gitignore_path) {
            warn!(path = %gitignore_path.display(), "partially parsed .gitignore: {}", err);
        }
    }

    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .with_context(|| format!("Invalid ignore pattern '{}'", pattern))?;
    }

    builder.build().context("Failed to build ignore rules")
}

fn file_matcher(pattern: &str) -> Result<GlobMatcher> {
    Ok(Glob::new(pattern)
        .with_context(|| format!("Invalid file pattern '{}'", pattern))?
        .compile_matcher())
}

fn is_excluded(base_dir: &Path, ignore: &Gitignore, path: &Path, is_dir: bool) -> bool {
    let Ok(relative) = path.strip_prefix(base_dir) else {
        return ignore.matched(path, is_dir).is_ignore();
    };

    if relative.to_string_lossy().starts_with('.') {
        debug!(path = %relative.display(), "skipped: hidden");
        return true;
    }

    if ignore.matched_path_or_any_parents(relative, is_dir).is_ignore() {
        debug!(path = %relative.display(), "skipped: ignored");
        return true;
    }

    false
}
