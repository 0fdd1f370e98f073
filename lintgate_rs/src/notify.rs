//! User-facing error notices with per-command dedup.
//!
//! A missing binary during a sequence of saves would otherwise raise an
//! alert per save; the gate delivers one notice per distinct failing
//! command signature and releases it once a run for the project succeeds.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;

use crate::exec::{EngineCommand, ExecError};

/// Install instructions linked from binary-not-found notices.
pub const INSTALL_GUIDE_URL: &str = "https://lintgate.dev/docs/install-engine";

/// One user-visible error notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub detail: String,
    pub remediation: Option<&'static str>,
}

/// Collaborator seam for surfacing notices in the editor.
pub trait Notifier: Send + Sync {
    fn error(&self, notice: Notice);
}

/// Delivers each distinct failure once.
pub struct NoticeGate {
    notifier: Arc<dyn Notifier>,
    delivered: DashMap<String, ()>,
}

impl NoticeGate {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            delivered: DashMap::new(),
        }
    }

    /// Report a failed engine invocation.
    pub fn exec_failure(&self, command: &EngineCommand, error: &ExecError) {
        let key = format!("exec::{}", command.signature());
        self.deliver(key, exec_notice(command, error));
    }

    /// Report malformed engine output for a project.
    pub fn parse_failure(&self, project: &Path) {
        let key = format!("parse::{}", project.display());
        self.deliver(
            key,
            Notice {
                title: "Invalid analysis output".to_string(),
                detail: format!(
                    "The engine returned malformed JSON for {}. \
                     The raw payload was written to the log.",
                    project.display()
                ),
                remediation: None,
            },
        );
    }

    /// Release gate entries for a project after a successful run, so a
    /// setup that breaks again notifies again.
    pub fn clear_project(&self, project: &Path) {
        let needle = project.display().to_string();
        self.delivered.retain(|key, _| !key.contains(&needle));
    }

    fn deliver(&self, key: String, notice: Notice) {
        if self.delivered.insert(key, ()).is_none() {
            self.notifier.error(notice);
        }
    }
}

fn exec_notice(command: &EngineCommand, error: &ExecError) -> Notice {
    let (detail, remediation) = match error {
        ExecError::NotFound(path) => (
            format!("The engine binary could not be found at `{}`.", path.display()),
            Some(INSTALL_GUIDE_URL),
        ),
        ExecError::NotExecutable(path) => (
            format!("`{}` does not point to an executable binary.", path.display()),
            Some(INSTALL_GUIDE_URL),
        ),
        ExecError::Timeout(limit) => (
            format!(
                "Analysis of {} did not finish within {}s.",
                command.cwd.display(),
                limit.as_secs()
            ),
            None,
        ),
        ExecError::Io(e) => (format!("Engine execution failed: {e}."), None),
    };
    Notice {
        title: "Analysis engine error".to_string(),
        detail,
        remediation,
    }
}
