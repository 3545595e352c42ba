//! Repository file discovery shared by the index and the dependency graph.
use super::languages::LanguageConfig;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directories never descended into, regardless of configuration.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", "__pycache__"];

/// A source file found under the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Root-relative, `/`-separated.
    pub rel_path: String,
}

/// Collect every Python file under `root`, sorted by relative path.
///
/// `.gitignore` rules are not applied; only the named directories are pruned.
pub fn source_files(root: &Path, exclude_dirs: &[String]) -> Vec<SourceFile> {
    let language = LanguageConfig::python();
    let excludes: Vec<String> = DEFAULT_EXCLUDES
        .iter()
        .map(|s| s.to_string())
        .chain(exclude_dirs.iter().cloned())
        .collect();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir
                && entry.depth() > 0
                && excludes.iter().any(|ex| entry.file_name() == ex.as_str()))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) || !language.matches(path) {
            continue;
        }
        if let Some(rel_path) = relative_path(root, path) {
            files.push(SourceFile {
                path: path.to_path_buf(),
                rel_path,
            });
        }
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    files
}

/// `path` relative to `root` with forward slashes.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
