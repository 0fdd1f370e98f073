//! Per-project fingerprint sets for one analysis cycle.
//!
//! Some engine plugins report the same logical finding more than once per
//! run; the store suppresses the repeats within a cycle.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dashmap::DashMap;

/// Fingerprints seen during the current analysis cycle, per project.
#[derive(Debug, Default)]
pub struct DedupStore {
    seen: DashMap<PathBuf, HashSet<String>>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this fingerprint was already reported in the current cycle.
    /// Records it either way, so the first caller gets `false` and every
    /// later caller gets `true`.
    pub fn reported_before(&self, project: &Path, fingerprint: &str) -> bool {
        let mut set = self.seen.entry(project.to_path_buf()).or_default();
        !set.insert(fingerprint.to_string())
    }

    /// Drop all fingerprints recorded for the project; called at the end of
    /// every cycle regardless of outcome.
    pub fn clear(&self, project: &Path) {
        self.seen.remove(project);
    }
}
