//! Wire model for the engine's `analyze -f json` output.
//!
//! The engine prints a JSON array of records. Only records whose `type` is
//! `issue` (case-insensitive) carry findings; other kinds (measurements,
//! engine chatter) are dropped during parsing.

use serde::{Deserialize, Serialize};

/// Severity of a produced diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One finding reported by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub engine_name: String,
    pub check_name: String,
    pub description: String,
    #[serde(default)]
    pub severity: Option<String>,
    /// Opaque per-finding identity; some engines omit it.
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub content: Option<Content>,
    pub location: IssueLocation,
}

impl Issue {
    /// Map the engine's severity domain onto the diagnostic one.
    /// `major` and `minor` are the known values; anything else is a warning.
    pub fn severity(&self) -> Severity {
        match self.severity.as_deref() {
            Some("major") => Severity::Error,
            Some("minor") => Severity::Warning,
            _ => Severity::Warning,
        }
    }

    /// One-line summary shown in the editor's diagnostics list.
    pub fn excerpt(&self) -> String {
        format!(
            "{}: {} [{}]",
            self.engine_name.to_uppercase(),
            self.description,
            self.check_name
        )
    }
}

/// Extended explanation attached to an issue.
#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub body: Option<String>,
}

/// Where the engine located the finding, relative to the project root.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueLocation {
    pub path: String,
    #[serde(flatten)]
    pub span: Span,
}

/// Line/column detail of a location: a whole-lines form or a positions form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Span {
    Positions { positions: Positions },
    Lines { lines: Lines },
}

/// `{ lines: { begin, end } }` form; all values 1-based.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Lines {
    pub begin: u32,
    #[serde(default)]
    pub end: Option<u32>,
}

/// `{ positions: { begin, end } }` form; all values 1-based.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Positions {
    pub begin: Anchor,
    #[serde(default)]
    pub end: Option<Anchor>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Anchor {
    pub line: u32,
    #[serde(default)]
    pub column: Option<u32>,
}

/// Parse raw engine output into issues.
///
/// Fails only when the payload is not a JSON array; a record of type `issue`
/// that does not decode is skipped with a log line so one bad record cannot
/// sink the whole cycle.
pub fn parse_issues(raw: &str) -> Result<Vec<Issue>, serde_json::Error> {
    let records: Vec<serde_json::Value> = serde_json::from_str(raw)?;

    let mut issues = Vec::new();
    for record in records {
        let Some(kind) = record.get("type").and_then(|v| v.as_str()) else {
            continue;
        };
        if !kind.eq_ignore_ascii_case("issue") {
            continue;
        }
        match serde_json::from_value::<Issue>(record) {
            Ok(issue) => issues.push(issue),
            Err(e) => tracing::warn!("skipping undecodable issue record: {e}"),
        }
    }
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "type": "issue",
            "engine_name": "structure",
            "check_name": "argument-count",
            "description": "Method `run` has 7 arguments",
            "severity": "major",
            "fingerprint": "abc123",
            "content": { "body": "Long parameter lists are hard to use." },
            "location": {
                "path": "src/app.py",
                "positions": { "begin": { "line": 2, "column": 12 }, "end": { "line": 2, "column": 15 } }
            }
        },
        {
            "type": "measurement",
            "name": "remediation_points",
            "value": 250000
        },
        {
            "type": "Issue",
            "engine_name": "style",
            "check_name": "line-length",
            "description": "Line too long",
            "severity": "minor",
            "fingerprint": "def456",
            "location": { "path": "src/app.py", "lines": { "begin": 5, "end": 5 } }
        }
    ]"#;

    #[test]
    fn non_issue_records_are_dropped() {
        let issues = parse_issues(SAMPLE).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].check_name, "argument-count");
    }

    #[test]
    fn issue_type_match_is_case_insensitive() {
        let issues = parse_issues(SAMPLE).unwrap();
        assert_eq!(issues[1].engine_name, "style");
    }

    #[test]
    fn severity_mapping_defaults_to_warning() {
        let issues = parse_issues(SAMPLE).unwrap();
        assert_eq!(issues[0].severity(), Severity::Error);
        assert_eq!(issues[1].severity(), Severity::Warning);

        let unknown = r#"[{
            "type": "issue",
            "engine_name": "e",
            "check_name": "c",
            "description": "d",
            "severity": "blocker",
            "location": { "path": "a.rs", "lines": { "begin": 1 } }
        }]"#;
        assert_eq!(parse_issues(unknown).unwrap()[0].severity(), Severity::Warning);
    }

    #[test]
    fn excerpt_upcases_engine_name() {
        let issues = parse_issues(SAMPLE).unwrap();
        assert_eq!(
            issues[0].excerpt(),
            "STRUCTURE: Method `run` has 7 arguments [argument-count]"
        );
    }

    #[test]
    fn both_location_forms_decode() {
        let issues = parse_issues(SAMPLE).unwrap();
        assert!(matches!(issues[0].location.span, Span::Positions { .. }));
        assert!(matches!(issues[1].location.span, Span::Lines { .. }));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(parse_issues("engine exploded: not json").is_err());
    }

    #[test]
    fn undecodable_issue_record_is_skipped() {
        let raw = r#"[
            { "type": "issue", "engine_name": "e" },
            {
                "type": "issue",
                "engine_name": "e",
                "check_name": "c",
                "description": "d",
                "location": { "path": "a.rs", "lines": { "begin": 3 } }
            }
        ]"#;
        let issues = parse_issues(raw).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].fingerprint.is_none());
    }
}
