//! Issue location to text range resolution.
//!
//! Engines report 1-based lines and columns, often with partial or no column
//! information. Output ranges are 0-based. When the affected file is open,
//! partial locations are widened to a meaningful token; otherwise a
//! best-effort estimate is produced from the numbers alone.

use serde::Serialize;
use serde::ser::SerializeTuple;

use crate::document::Document;
use crate::issue::Span;

/// A 0-based position in a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPoint {
    pub row: u32,
    pub column: u32,
}

impl TextPoint {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

// Wire shape is `[row, column]`, matching the diagnostic contract.
impl Serialize for TextPoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.row)?;
        tup.serialize_element(&self.column)?;
        tup.end()
    }
}

/// A 0-based text range: `[[row, col], [row, col]]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: TextPoint,
    pub end: TextPoint,
}

impl TextRange {
    pub fn new(start: TextPoint, end: TextPoint) -> Self {
        Self { start, end }
    }
}

impl Serialize for TextRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.start)?;
        tup.serialize_element(&self.end)?;
        tup.end()
    }
}

/// Resolve a reported issue location to a concrete range.
///
/// All 1-based inputs are normalized to 0-based here. A begin column of 1
/// maps to column 0; the decrement goes through `Option` so the zero is
/// never mistaken for an absent value.
pub fn resolve_range(span: &Span, doc: Option<&Document>) -> TextRange {
    match span {
        Span::Lines { lines } => {
            let row = lines.begin.saturating_sub(1);
            match doc {
                Some(doc) => token_range(doc, row, None),
                None => {
                    let end_row = lines.end.unwrap_or(lines.begin).saturating_sub(1);
                    TextRange::new(TextPoint::new(row, 0), TextPoint::new(end_row, 0))
                }
            }
        }
        Span::Positions { positions } => {
            let row = positions.begin.line.saturating_sub(1);
            let end_row = positions
                .end
                .map(|end| end.line.saturating_sub(1))
                .unwrap_or(row);

            // An engine that reports a line but no begin column gets the
            // same treatment as a line-only issue.
            let Some(column) = positions.begin.column else {
                return match doc {
                    Some(doc) => token_range(doc, row, None),
                    None => TextRange::new(TextPoint::new(row, 0), TextPoint::new(end_row, 0)),
                };
            };
            let column = column.saturating_sub(1);
            let end_column = positions.end.and_then(|end| end.column.map(|c| c.saturating_sub(1)));

            match end_column {
                // Both ends known and distinct: the exact range, no estimation.
                Some(end_column) if end_column != column => TextRange::new(
                    TextPoint::new(row, column),
                    TextPoint::new(end_row, end_column),
                ),
                // Missing or zero-width end: widen to the token at the begin
                // column when a document is available.
                _ => match doc {
                    Some(doc) => token_range(doc, row, Some(column)),
                    None => TextRange::new(
                        TextPoint::new(row, column),
                        TextPoint::new(end_row, end_column.unwrap_or(column)),
                    ),
                },
            }
        }
    }
}

/// Expand a partial location to a token range using the line's text.
///
/// Without a column, the range covers the first non-whitespace character to
/// the end of the line. With a column, it covers the word starting there, or
/// the rest of the line when the column does not sit on a word character.
fn token_range(doc: &Document, row: u32, column: Option<u32>) -> TextRange {
    let Some(line) = doc.line(row) else {
        // Line is outside the buffer (stale analysis); pin to its start.
        let column = column.unwrap_or(0);
        return TextRange::new(TextPoint::new(row, column), TextPoint::new(row, column));
    };
    let len = line.chars().count() as u32;

    match column {
        None => {
            let indent = line.chars().take_while(|c| c.is_whitespace()).count() as u32;
            let start = if indent >= len { 0 } else { indent };
            TextRange::new(TextPoint::new(row, start), TextPoint::new(row, len))
        }
        Some(column) => {
            let column = column.min(len);
            let word = line
                .chars()
                .skip(column as usize)
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .count() as u32;
            let end = if word == 0 { len.max(column) } else { column + word };
            TextRange::new(TextPoint::new(row, column), TextPoint::new(row, end))
        }
    }
}
