//! Conversion from coordinator diagnostics to LSP diagnostics.

use std::collections::HashMap;
use std::path::PathBuf;

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use lintgate::Severity;

/// Group coordinator results by file, converted to LSP diagnostics.
pub fn group_by_file(
    diagnostics: Vec<lintgate::Diagnostic>,
) -> HashMap<PathBuf, Vec<Diagnostic>> {
    let mut by_file: HashMap<PathBuf, Vec<Diagnostic>> = HashMap::new();
    for diagnostic in diagnostics {
        let file = diagnostic.location.file.clone();
        by_file.entry(file).or_default().push(to_lsp(diagnostic));
    }
    by_file
}

fn to_lsp(diagnostic: lintgate::Diagnostic) -> Diagnostic {
    let position = diagnostic.location.position;
    let severity = match diagnostic.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
    };

    let mut message = diagnostic.excerpt;
    if let Some(body) = diagnostic.description {
        message.push_str("\n\n");
        message.push_str(&body);
    }

    Diagnostic {
        range: Range {
            start: Position {
                line: position.start.row,
                character: position.start.column,
            },
            end: Position {
                line: position.end.row,
                character: position.end.column,
            },
        },
        severity: Some(severity),
        source: Some("lintgate".to_string()),
        message,
        ..Default::default()
    }
}
