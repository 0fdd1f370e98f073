//! # lintgate
//!
//! Editor bridge for external static-analysis engines that speak the
//! issue-JSON protocol. One save burst per project becomes exactly one
//! engine run; findings are deduplicated, mapped onto concrete text
//! ranges, and handed to the editor's diagnostics layer.
//!
//! ## How a save becomes a diagnostic
//!
//! 1. A save event reaches [`AnalysisCoordinator::handle_trigger`].
//! 2. The file's project root is resolved (and memoized) by walking up to
//!    the engine's config marker, then a `.git` marker.
//! 3. The trigger joins the project's debounce window; only the last
//!    trigger of a burst invokes the engine (`analyze -f json`).
//! 4. Output records are filtered to issues, deduplicated by fingerprint,
//!    and their locations resolved to 0-based text ranges.
//!
//! The LSP front-end lives in the `lintgate-lsp` crate; the `lintgate`
//! binary in this crate runs one-shot analyses from the command line.

/// Per-project debounce/coalescing of triggers.
pub mod coalesce;

/// Configuration loading and defaults.
pub mod config;

/// The orchestrator tying the pieces together.
pub mod coordinator;

/// Per-cycle fingerprint dedup.
pub mod dedup;

/// Open-buffer snapshots and per-file records.
pub mod document;

/// Engine process invocation with unique-key supersede.
pub mod exec;

/// Wire model of the engine's JSON output.
pub mod issue;

/// User-facing error notices with per-command dedup.
pub mod notify;

/// Issue location to text range resolution.
pub mod range;

/// Project root discovery with memoization.
pub mod roots;

pub use coalesce::DEBOUNCE_INTERVAL;
pub use config::{AnalysisScope, LintgateConfig};
pub use coordinator::{AnalysisCoordinator, Diagnostic, DiagnosticLocation};
pub use exec::{EngineCommand, EngineRunner, ExecError, ProcessEngineRunner};
pub use issue::Severity;
pub use notify::{Notice, Notifier};
pub use range::{TextPoint, TextRange};
