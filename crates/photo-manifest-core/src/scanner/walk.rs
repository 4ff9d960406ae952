use crate::error::Error;
use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::{DirEntry, WalkDir};

/// Collect regular files under `root`, filtered by a case-insensitive extension
/// allow-list (leading dots ignored; empty means every file) and glob ignore
/// patterns. Symlinks are not followed. Results are in walk order, sorted by
/// file name within each directory.
pub fn collect_files(
    root: &Path,
    recursive: bool,
    extensions: &[String],
    ignore_globs: &[String],
) -> Result<Vec<PathBuf>, Error> {
    if !root.exists() {
        return Err(Error::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let allowed: HashSet<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e, &ignore_patterns));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error accessing entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if allowed.is_empty() || has_allowed_extension(entry.path(), &allowed) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn is_ignored(entry: &DirEntry, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|p| p.matches_path(entry.path()))
}

fn has_allowed_extension(path: &Path, allowed: &HashSet<String>) -> bool {
    path.extension()
        .map(|e| allowed.contains(&e.to_string_lossy().to_lowercase()))
        .unwrap_or(false)
}
