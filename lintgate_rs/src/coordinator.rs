//! Orchestration of one analysis cycle per burst of save events.
//!
//! A trigger resolves its project, joins the project's debounce window, and
//! only the last trigger of the burst invokes the engine. The winner parses
//! the output, filters and deduplicates issues, resolves ranges, and hands
//! back the full diagnostic list for the project. Superseded triggers
//! resolve to `None`, which callers must absorb without touching any
//! previously published diagnostics.
//!
//! All per-project state lives on the coordinator instance, so independent
//! coordinators can coexist (one per editor session, one per test).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;

use crate::coalesce::{DebounceOutcome, RunCoalescer};
use crate::config::{AnalysisScope, LintgateConfig};
use crate::dedup::DedupStore;
use crate::document::{Document, OpenFileRecord};
use crate::exec::{DEFAULT_TIMEOUT, EngineCommand, EngineRunner};
use crate::issue::{Issue, Severity, parse_issues};
use crate::notify::{NoticeGate, Notifier};
use crate::range::{TextRange, resolve_range};
use crate::roots::ProjectRootResolver;

/// Namespace prefix of engine-invocation unique keys.
const UNIQUE_KEY_PREFIX: &str = "lintgate";

/// Editor-consumable representation of one reported issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// `ENGINE: description [check-name]`.
    pub excerpt: String,
    /// Extended explanation, when the engine supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub location: DiagnosticLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticLocation {
    pub file: PathBuf,
    pub position: TextRange,
}

/// Top-level orchestrator owning all per-file and per-project state.
pub struct AnalysisCoordinator {
    config: LintgateConfig,
    runner: Arc<dyn EngineRunner>,
    notices: NoticeGate,
    roots: ProjectRootResolver,
    open_files: DashMap<PathBuf, OpenFileRecord>,
    dedup: DedupStore,
    coalescer: RunCoalescer,
}

impl AnalysisCoordinator {
    pub fn new(
        config: LintgateConfig,
        runner: Arc<dyn EngineRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            runner,
            notices: NoticeGate::new(notifier),
            roots: ProjectRootResolver::new(),
            open_files: DashMap::new(),
            dedup: DedupStore::new(),
            coalescer: RunCoalescer::new(),
        }
    }

    pub fn config(&self) -> &LintgateConfig {
        &self.config
    }

    /// The project root owning `file`, creating the file's record if this
    /// is the first observation. Concurrent first observations converge on
    /// one record.
    pub fn project_for(&self, file: &Path) -> PathBuf {
        let record = self
            .open_files
            .entry(file.to_path_buf())
            .or_insert_with(|| OpenFileRecord::untracked(self.roots.resolve(file)));
        record.project.clone()
    }

    /// Attach a live document to the file's record (editor opened it).
    pub fn open_file(&self, file: &Path, text: impl Into<String>) {
        let mut record = self
            .open_files
            .entry(file.to_path_buf())
            .or_insert_with(|| OpenFileRecord::untracked(self.roots.resolve(file)));
        record.document = Some(Document::new(text));
    }

    /// Replace the buffer contents of an open file (full-sync update).
    pub fn update_file(&self, file: &Path, text: impl Into<String>) {
        if let Some(mut record) = self.open_files.get_mut(file) {
            match record.document.as_mut() {
                Some(document) => document.replace(text),
                None => record.document = Some(Document::new(text)),
            }
        }
    }

    /// Move a record to a new path, preserving its project identity.
    pub fn rename_file(&self, old: &Path, new: &Path) {
        if let Some((_, record)) = self.open_files.remove(old) {
            self.roots.forget(old);
            self.open_files.insert(new.to_path_buf(), record);
        }
    }

    /// Drop the record and cached root of a closed file.
    pub fn close_file(&self, file: &Path) {
        self.open_files.remove(file);
        self.roots.forget(file);
    }

    /// Paths of files in `project` that have a live document.
    pub fn open_paths_in(&self, project: &Path) -> Vec<PathBuf> {
        self.open_files
            .iter()
            .filter(|entry| entry.value().document.is_some() && entry.value().project == project)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Handle one editor trigger (save) for `file`.
    ///
    /// Returns `None` when this trigger was superseded (a later call
    /// supplies the authoritative result) and `Some` with the project's
    /// diagnostics when this trigger won its burst. A file without a
    /// backing path (unsaved buffer) yields an empty result immediately:
    /// a path-based external tool cannot analyze it.
    pub async fn handle_trigger(&self, file: Option<&Path>) -> Option<Vec<Diagnostic>> {
        let Some(file) = file else {
            return Some(Vec::new());
        };
        let project = self.project_for(file);

        if self.coalescer.debounce(&project).await == DebounceOutcome::Superseded {
            return None;
        }

        tracing::debug!("analyzing project {}", project.display());
        let started = Instant::now();

        let command = self.engine_command(&project, file);
        let raw = match self.runner.run(&command).await {
            Ok(Some(raw)) => raw,
            // A concurrent invocation for the same project took over; its
            // own cycle will reset state and publish results.
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("engine run failed for {}: {e}", project.display());
                self.notices.exec_failure(&command, &e);
                self.finish_cycle(&project);
                return None;
            }
        };

        let issues = match parse_issues(&raw) {
            Ok(issues) => issues,
            Err(e) => {
                tracing::error!(
                    project = %project.display(),
                    raw = %raw,
                    "invalid JSON from engine: {e}"
                );
                self.notices.parse_failure(&project);
                self.finish_cycle(&project);
                return Some(Vec::new());
            }
        };

        let diagnostics = self.collect_diagnostics(&project, issues);

        self.notices.clear_project(&project);
        self.finish_cycle(&project);
        tracing::debug!(
            "analysis of {} produced {} diagnostics in {:.0?}",
            project.display(),
            diagnostics.len(),
            started.elapsed()
        );
        Some(diagnostics)
    }

    fn collect_diagnostics(&self, project: &Path, issues: Vec<Issue>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for issue in issues {
            let file = project.join(&issue.location.path);

            let record = self.open_files.get(&file);
            let document = record.as_deref().and_then(|r| r.document.as_ref());
            if document.is_none() && !self.config.include_unopened {
                continue;
            }

            if let Some(fingerprint) = &issue.fingerprint
                && self.dedup.reported_before(project, fingerprint)
            {
                continue;
            }

            let severity = issue.severity();
            let excerpt = issue.excerpt();
            let position = resolve_range(&issue.location.span, document);
            drop(record);

            diagnostics.push(Diagnostic {
                severity,
                excerpt,
                description: issue.content.and_then(|content| content.body),
                location: DiagnosticLocation { file, position },
            });
        }
        diagnostics
    }

    fn engine_command(&self, project: &Path, trigger: &Path) -> EngineCommand {
        let mut args = vec!["analyze".to_string(), "-f".to_string(), "json".to_string()];
        let mut unique_key = format!("{UNIQUE_KEY_PREFIX}::{}", project.display());

        if self.config.scope == AnalysisScope::File {
            let relative = trigger.strip_prefix(project).unwrap_or(trigger);
            args.push(relative.display().to_string());
            unique_key.push_str(&format!("::{}", relative.display()));
        }

        EngineCommand {
            executable: self.config.engine_path.clone(),
            args,
            cwd: project.to_path_buf(),
            unique_key,
            timeout: (!self.config.disable_timeout).then_some(DEFAULT_TIMEOUT),
        }
    }

    /// Return the project's coalescing and dedup state to idle.
    fn finish_cycle(&self, project: &Path) {
        self.dedup.clear(project);
        self.coalescer.reset(project);
    }
}
