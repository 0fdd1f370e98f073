//! End-to-end coordinator behavior against scripted collaborators.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use lintgate::config::{AnalysisScope, LintgateConfig};
use lintgate::coordinator::AnalysisCoordinator;
use lintgate::exec::{EngineCommand, EngineRunner, ExecError};
use lintgate::issue::Severity;
use lintgate::notify::{Notice, Notifier};
use lintgate::range::{TextPoint, TextRange};
use lintgate::roots::ENGINE_CONFIG_MARKER;

/// One scripted engine response per invocation, in order.
enum Scripted {
    Output(String),
    Superseded,
    NotFound,
}

#[derive(Default)]
struct ScriptedRunner {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    commands: Mutex<Vec<EngineCommand>>,
}

impl ScriptedRunner {
    fn push(&self, response: Scripted) {
        self.script.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_command(&self) -> EngineCommand {
        self.commands.lock().unwrap().last().unwrap().clone()
    }
}

#[async_trait]
impl EngineRunner for ScriptedRunner {
    async fn run(&self, command: &EngineCommand) -> Result<Option<String>, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.commands.lock().unwrap().push(command.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Output(raw)) => Ok(Some(raw)),
            Some(Scripted::Superseded) => Ok(None),
            Some(Scripted::NotFound) => Err(ExecError::NotFound(command.executable.clone())),
            None => Ok(Some("[]".to_string())),
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

struct Fixture {
    temp: TempDir,
    runner: Arc<ScriptedRunner>,
    notifier: Arc<RecordingNotifier>,
    coordinator: Arc<AnalysisCoordinator>,
}

impl Fixture {
    fn new(config: LintgateConfig) -> Self {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(ENGINE_CONFIG_MARKER), "").unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();

        let runner = Arc::new(ScriptedRunner::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = Arc::new(AnalysisCoordinator::new(
            config,
            runner.clone(),
            notifier.clone(),
        ));
        Self {
            temp,
            runner,
            notifier,
            coordinator,
        }
    }

    fn with_defaults() -> Self {
        Self::new(LintgateConfig::default())
    }

    fn file(&self, relative: &str) -> PathBuf {
        let path = self.temp.path().join(relative);
        std::fs::write(&path, "").unwrap();
        path
    }

    fn open(&self, relative: &str, text: &str) -> PathBuf {
        let path = self.file(relative);
        self.coordinator.open_file(&path, text);
        path
    }
}

fn issue(path: &str, fingerprint: &str, severity: &str, line: u32) -> serde_json::Value {
    json!({
        "type": "issue",
        "engine_name": "structure",
        "check_name": "complexity",
        "description": "Function is too complex",
        "severity": severity,
        "fingerprint": fingerprint,
        "location": { "path": path, "lines": { "begin": line, "end": line } }
    })
}

#[tokio::test(start_paused = true)]
async fn burst_of_saves_runs_engine_once() {
    let fixture = Fixture::with_defaults();
    let a = fixture.open("src/a.py", "def a(): pass\n");
    let b = fixture.open("src/b.py", "def b(): pass\n");
    fixture
        .runner
        .push(Scripted::Output(json!([issue("src/a.py", "fp-a", "minor", 1)]).to_string()));

    let early = {
        let coordinator = fixture.coordinator.clone();
        tokio::spawn(async move { coordinator.handle_trigger(Some(&a)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let late = {
        let coordinator = fixture.coordinator.clone();
        tokio::spawn(async move { coordinator.handle_trigger(Some(&b)).await })
    };

    assert_eq!(early.await.unwrap(), None);
    let diagnostics = late.await.unwrap().expect("winner carries the results");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(fixture.runner.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn unsaved_buffer_yields_empty_result() {
    let fixture = Fixture::with_defaults();
    let result = fixture.coordinator.handle_trigger(None).await;
    assert_eq!(result, Some(Vec::new()));
    assert_eq!(fixture.runner.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn duplicate_fingerprints_collapse_within_a_cycle() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    fixture.runner.push(Scripted::Output(
        json!([
            issue("src/a.py", "fp-same", "minor", 1),
            issue("src/a.py", "fp-same", "minor", 1),
            issue("src/a.py", "fp-other", "minor", 1)
        ])
        .to_string(),
    ));

    let diagnostics = fixture
        .coordinator
        .handle_trigger(Some(&file))
        .await
        .unwrap();
    assert_eq!(diagnostics.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn fingerprints_reset_between_cycles() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    for _ in 0..2 {
        fixture
            .runner
            .push(Scripted::Output(json!([issue("src/a.py", "fp", "minor", 1)]).to_string()));
    }

    for _ in 0..2 {
        let diagnostics = fixture
            .coordinator
            .handle_trigger(Some(&file))
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn non_issue_records_are_ignored() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    fixture.runner.push(Scripted::Output(
        json!([
            { "type": "Measurement", "name": "remediation_points", "value": 5 },
            issue("src/a.py", "fp", "minor", 1)
        ])
        .to_string(),
    ));

    let diagnostics = fixture
        .coordinator
        .handle_trigger(Some(&file))
        .await
        .unwrap();
    assert_eq!(diagnostics.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn issues_in_unopened_files_are_dropped_by_default() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    fixture.file("src/other.py");
    fixture
        .runner
        .push(Scripted::Output(json!([issue("src/other.py", "fp", "minor", 1)]).to_string()));

    let diagnostics = fixture
        .coordinator
        .handle_trigger(Some(&file))
        .await
        .unwrap();
    assert!(diagnostics.is_empty());
}

#[tokio::test(start_paused = true)]
async fn whole_workspace_mode_estimates_ranges_for_unopened_files() {
    let config = LintgateConfig {
        include_unopened: true,
        ..Default::default()
    };
    let fixture = Fixture::new(config);
    let file = fixture.open("src/a.py", "x = 1\n");
    fixture.file("src/other.py");
    fixture
        .runner
        .push(Scripted::Output(json!([issue("src/other.py", "fp", "minor", 5)]).to_string()));

    let diagnostics = fixture
        .coordinator
        .handle_trigger(Some(&file))
        .await
        .unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].location.position,
        TextRange::new(TextPoint::new(4, 0), TextPoint::new(4, 0))
    );
    assert_eq!(
        diagnostics[0].location.file,
        fixture.temp.path().join("src/other.py")
    );
}

#[tokio::test(start_paused = true)]
async fn open_document_refines_line_only_ranges() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "    total = compute()\n");
    fixture
        .runner
        .push(Scripted::Output(json!([issue("src/a.py", "fp", "minor", 1)]).to_string()));

    let diagnostics = fixture
        .coordinator
        .handle_trigger(Some(&file))
        .await
        .unwrap();
    assert_eq!(
        diagnostics[0].location.position,
        TextRange::new(TextPoint::new(0, 4), TextPoint::new(0, 21))
    );
}

#[tokio::test(start_paused = true)]
async fn severity_maps_major_to_error() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    fixture.runner.push(Scripted::Output(
        json!([
            issue("src/a.py", "fp-1", "major", 1),
            issue("src/a.py", "fp-2", "minor", 1),
            issue("src/a.py", "fp-3", "unheard-of", 1)
        ])
        .to_string(),
    ));

    let diagnostics = fixture
        .coordinator
        .handle_trigger(Some(&file))
        .await
        .unwrap();
    let severities: Vec<Severity> = diagnostics.iter().map(|d| d.severity).collect();
    assert_eq!(
        severities,
        vec![Severity::Error, Severity::Warning, Severity::Warning]
    );
    assert_eq!(diagnostics[0].excerpt, "STRUCTURE: Function is too complex [complexity]");
}

#[tokio::test(start_paused = true)]
async fn externally_superseded_run_is_absorbed_silently() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    fixture.runner.push(Scripted::Superseded);

    let result = fixture.coordinator.handle_trigger(Some(&file)).await;
    assert_eq!(result, None);
    assert_eq!(fixture.notifier.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_binary_notifies_once_across_cycles() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    fixture.runner.push(Scripted::NotFound);
    fixture.runner.push(Scripted::NotFound);

    assert_eq!(fixture.coordinator.handle_trigger(Some(&file)).await, None);
    assert_eq!(fixture.coordinator.handle_trigger(Some(&file)).await, None);

    assert_eq!(fixture.runner.calls(), 2);
    assert_eq!(fixture.notifier.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn successful_cycle_rearms_failure_notices() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    fixture.runner.push(Scripted::NotFound);
    fixture.runner.push(Scripted::Output("[]".to_string()));
    fixture.runner.push(Scripted::NotFound);

    fixture.coordinator.handle_trigger(Some(&file)).await;
    fixture.coordinator.handle_trigger(Some(&file)).await;
    fixture.coordinator.handle_trigger(Some(&file)).await;

    assert_eq!(fixture.notifier.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_output_yields_empty_result_and_notice() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    fixture
        .runner
        .push(Scripted::Output("engine stack trace, not json".to_string()));

    let result = fixture.coordinator.handle_trigger(Some(&file)).await;
    assert_eq!(result, Some(Vec::new()));
    assert_eq!(fixture.notifier.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn engine_runs_in_the_project_root() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");

    fixture.coordinator.handle_trigger(Some(&file)).await;

    let command = fixture.runner.last_command();
    assert_eq!(command.cwd, fixture.temp.path());
    assert_eq!(command.args, vec!["analyze", "-f", "json"]);
    assert!(command.unique_key.ends_with(&fixture.temp.path().display().to_string()));
}

#[tokio::test(start_paused = true)]
async fn file_scope_narrows_the_run_to_the_trigger() {
    let config = LintgateConfig {
        scope: AnalysisScope::File,
        ..Default::default()
    };
    let fixture = Fixture::new(config);
    let file = fixture.open("src/a.py", "x = 1\n");

    fixture.coordinator.handle_trigger(Some(&file)).await;

    let command = fixture.runner.last_command();
    assert_eq!(command.args, vec!["analyze", "-f", "json", "src/a.py"]);
    assert!(command.unique_key.ends_with("src/a.py"));
}

#[tokio::test(start_paused = true)]
async fn rename_preserves_the_cached_project_identity() {
    let fixture = Fixture::with_defaults();
    let old = fixture.open("src/a.py", "x = 1\n");
    let project = fixture.coordinator.project_for(&old);

    // The new location has no marker of its own.
    let elsewhere = TempDir::new().unwrap();
    let new = elsewhere.path().join("a.py");
    fixture.coordinator.rename_file(&old, &new);

    assert_eq!(fixture.coordinator.project_for(&new), project);
    assert!(fixture.coordinator.open_paths_in(&project).contains(&new));
}

#[tokio::test(start_paused = true)]
async fn closed_files_stop_being_open_paths() {
    let fixture = Fixture::with_defaults();
    let file = fixture.open("src/a.py", "x = 1\n");
    let project = fixture.coordinator.project_for(&file);
    assert_eq!(fixture.coordinator.open_paths_in(&project), vec![file.clone()]);

    fixture.coordinator.close_file(&file);
    assert!(fixture.coordinator.open_paths_in(&project).is_empty());
}
