//! Per-project debounce/coalescing of analysis triggers.
//!
//! Editors fire one save event per file. Saving many files of one project in
//! quick succession (multi-file refactor, branch checkout) must produce one
//! analysis run, not one per file. Every trigger parks for the debounce
//! interval; when it wakes it removes the oldest pending timestamp, and only
//! the caller that leaves the sequence empty goes on to run the analysis.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Fixed delay after a trigger during which further triggers for the same
/// project merge into the pending run.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(250);

/// What became of one trigger after its debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// Last trigger of the burst; this caller runs the analysis.
    Winner,
    /// A newer trigger is still pending and will supply the results.
    Superseded,
}

/// Pending-trigger timestamps per project root.
#[derive(Debug, Default)]
pub struct RunCoalescer {
    pending: DashMap<PathBuf, Vec<Instant>>,
}

impl RunCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trigger, wait out the debounce interval, and decide
    /// whether this caller won the burst.
    pub async fn debounce(&self, project: &Path) -> DebounceOutcome {
        self.pending
            .entry(project.to_path_buf())
            .or_default()
            .push(Instant::now());

        tokio::time::sleep(DEBOUNCE_INTERVAL).await;

        let remaining = match self.pending.get_mut(project) {
            Some(mut entry) => {
                if !entry.is_empty() {
                    entry.remove(0);
                }
                entry.len()
            }
            // Reset raced with the wakeup; nothing pending means no newer
            // trigger, so this caller proceeds.
            None => 0,
        };

        if remaining > 0 {
            tracing::trace!(
                project = %project.display(),
                remaining,
                "trigger superseded by a newer save"
            );
            DebounceOutcome::Superseded
        } else {
            DebounceOutcome::Winner
        }
    }

    /// Clear the project's pending sequence at the end of a cycle.
    pub fn reset(&self, project: &Path) {
        self.pending.remove(project);
    }
}
