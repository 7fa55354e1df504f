//! File discovery for a working directory.
//!
//! Walks the tree with gitignore rules applied; `.git` itself is skipped.

use std::path::{Component, Path, PathBuf};

use contextfit_core::EngineError;
use ignore::WalkBuilder;

/// Every file under `root`, as sorted paths relative to `root`.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut builder = WalkBuilder::new(root);
    builder.hidden(false);
    builder.git_ignore(true);
    builder.git_exclude(true);
    builder.git_global(false);
    builder.require_git(false);
    builder.follow_links(false);
    builder.filter_entry(|entry| entry.file_name() != ".git");

    for entry in builder.build() {
        let entry = entry.map_err(|e| EngineError::Io {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        files.push(rel);
    }

    files.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
    Ok(files)
}

/// Lexically resolve `.` and `..` in `path` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
