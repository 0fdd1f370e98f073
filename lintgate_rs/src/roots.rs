//! Project root discovery with per-file memoization.
//!
//! The root is the directory the engine is invoked in. Search order: the
//! engine's config marker upward from the file's directory, then a `.git`
//! marker, then the file's own directory as the final fallback. The search
//! always terminates with a usable directory.

use std::path::{Path, PathBuf};

use dashmap::DashMap;

/// Engine configuration file marking a project root.
pub const ENGINE_CONFIG_MARKER: &str = ".lintgate.yml";

/// Version-control marker used when no engine config exists.
const VCS_MARKER: &str = ".git";

/// Walk upward from `start` and return the first directory containing
/// `marker` (a file or directory of that name).
pub fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        if current.join(marker).exists() {
            return Some(current.to_path_buf());
        }
        dir = current.parent();
    }
    None
}

/// Memoized file-path → project-root resolution.
///
/// The disk search runs once per file path; the result is cached for the
/// lifetime of the open document and dropped when the file is closed.
#[derive(Debug, Default)]
pub struct ProjectRootResolver {
    cache: DashMap<PathBuf, PathBuf>,
}

impl ProjectRootResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the project root owning `file`.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if let Some(hit) = self.cache.get(file) {
            return hit.clone();
        }
        let root = search_root(file);
        self.cache.insert(file.to_path_buf(), root.clone());
        root
    }

    /// Drop the cached root for a closed or renamed file.
    pub fn forget(&self, file: &Path) {
        self.cache.remove(file);
    }
}

fn search_root(file: &Path) -> PathBuf {
    let file_dir = file.parent().unwrap_or(Path::new("."));
    if let Some(root) = find_upward(file_dir, ENGINE_CONFIG_MARKER) {
        return root;
    }
    if let Some(root) = find_upward(file_dir, VCS_MARKER) {
        return root;
    }
    file_dir.to_path_buf()
}
