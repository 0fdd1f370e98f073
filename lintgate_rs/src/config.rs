//! Configuration for the coordinator.
//!
//! Loads optional `.lintgate/config.toml` from a project root; editors can
//! supply the same fields through initialization options instead. The
//! debounce interval is a fixed constant and deliberately not configurable.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Engine binary looked up on PATH when no explicit path is configured.
pub const DEFAULT_ENGINE: &str = "lintgate-engine";

/// What the engine is asked to analyze on a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisScope {
    /// One run covers the whole project of the saved file.
    #[default]
    Project,
    /// The run is narrowed to the saved file itself.
    File,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LintgateConfig {
    /// Path to the engine binary.
    pub engine_path: PathBuf,
    /// Run the engine without a wall-clock bound.
    pub disable_timeout: bool,
    pub scope: AnalysisScope,
    /// Report issues in project files that are not open in the editor,
    /// with estimated ranges.
    pub include_unopened: bool,
}

impl Default for LintgateConfig {
    fn default() -> Self {
        Self {
            engine_path: PathBuf::from(DEFAULT_ENGINE),
            disable_timeout: false,
            scope: AnalysisScope::Project,
            include_unopened: false,
        }
    }
}

impl LintgateConfig {
    /// Load config from `.lintgate/config.toml` in the given root directory.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load(root: &Path) -> Self {
        Self::load_from_path(&root.join(".lintgate").join("config.toml"))
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("failed to parse {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", path.display());
                Self::default()
            }
        }
    }
}
