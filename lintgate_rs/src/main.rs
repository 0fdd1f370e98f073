//! # lintgate CLI
//!
//! One-shot analysis of the projects owning the given files. Runs the same
//! coordinator the LSP front-end uses, in whole-workspace mode, and prints
//! the diagnostics as text or JSON.
//!
//! ```bash
//! lintgate src/app.py
//! lintgate --engine /opt/engine/bin/engine --json src/app.py lib/util.py
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use lintgate::config::{AnalysisScope, LintgateConfig};
use lintgate::coordinator::AnalysisCoordinator;
use lintgate::exec::ProcessEngineRunner;
use lintgate::issue::Severity;
use lintgate::notify::{Notice, Notifier};

#[derive(Parser, Debug)]
#[command(name = "lintgate")]
#[command(about = "Run an issue-JSON analysis engine over the projects owning the given files")]
#[command(version)]
struct Args {
    /// Files whose projects should be analyzed
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Path to the engine binary (default: `lintgate-engine` on PATH)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Narrow each run to the triggering file instead of its whole project
    #[arg(long, value_enum, default_value_t = ScopeArg::Project)]
    scope: ScopeArg,

    /// Run the engine without a wall-clock limit
    #[arg(long)]
    no_timeout: bool,

    /// Emit diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    Project,
    File,
}

impl From<ScopeArg> for AnalysisScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Project => AnalysisScope::Project,
            ScopeArg::File => AnalysisScope::File,
        }
    }
}

/// Prints coordinator notices on stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&self, notice: Notice) {
        eprintln!("[lintgate] {}: {}", notice.title, notice.detail);
        if let Some(url) = notice.remediation {
            eprintln!("[lintgate] install guide: {url}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&args.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = LintgateConfig::load(&std::env::current_dir()?);
    if let Some(engine) = args.engine {
        config.engine_path = engine;
    }
    config.scope = args.scope.into();
    config.disable_timeout = args.no_timeout || config.disable_timeout;
    // No editor here, so every project file counts as reportable.
    config.include_unopened = true;

    let coordinator = AnalysisCoordinator::new(
        config,
        Arc::new(ProcessEngineRunner::new()),
        Arc::new(StderrNotifier),
    );

    let mut files = Vec::new();
    for file in &args.files {
        let file = file
            .canonicalize()
            .with_context(|| format!("no such file: {}", file.display()))?;
        files.push(file);
    }

    // One analysis cycle per distinct project; later files of an
    // already-analyzed project are skipped.
    let mut analyzed = BTreeSet::new();
    let mut diagnostics = Vec::new();
    for file in &files {
        let project = coordinator.project_for(file);
        if !analyzed.insert(project) {
            continue;
        }
        if let Some(results) = coordinator.handle_trigger(Some(file)).await {
            diagnostics.extend(results);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    } else {
        for diagnostic in &diagnostics {
            let start = diagnostic.location.position.start;
            println!(
                "{}:{}:{}: {}: {}",
                diagnostic.location.file.display(),
                start.row + 1,
                start.column + 1,
                diagnostic.severity,
                diagnostic.excerpt
            );
        }
    }

    let has_errors = diagnostics
        .iter()
        .any(|diagnostic| diagnostic.severity == Severity::Error);
    Ok(if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
