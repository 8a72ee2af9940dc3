//! Source span tracking for error reporting.

use serde::{Deserialize, Serialize};

/// Represents a position in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, counted in characters)
    pub column: usize,
    /// Byte offset from the start of the source
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// Represents a span in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start position
    pub start: Position,
    /// End position
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// The line the span starts on.
    pub fn line(&self) -> usize {
        self.start.line
    }

    /// The column the span starts on.
    pub fn column(&self) -> usize {
        self.start.column
    }

    /// Byte length of the span.
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge two spans into one that covers both
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start.offset < other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset > other.end.offset {
            self.end
        } else {
            other.end
        };
        Span { start, end }
    }
}

/// Maps byte offsets to line/column positions.
///
/// Built once per source text; lookups are a binary search over the
/// recorded line starts.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (offset, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            source,
            line_starts,
        }
    }

    /// Convert a byte offset to a position
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let line_start = self.line_starts[line];
        let column = self.source[line_start..offset].chars().count() + 1;
        Position::new(line + 1, column, offset)
    }

    /// Build a span from a byte range.
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.position(start), self.position(end))
    }

    /// The text of a 1-indexed line, without its terminator.
    pub fn line_text(&self, line: usize) -> Option<&'a str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_track_lines_and_columns() {
        let index = LineIndex::new("ab\ncd\n\nx");
        assert_eq!(index.position(0), Position::new(1, 1, 0));
        assert_eq!(index.position(1), Position::new(1, 2, 1));
        assert_eq!(index.position(3), Position::new(2, 1, 3));
        assert_eq!(index.position(7), Position::new(4, 1, 7));
    }

    #[test]
    fn test_columns_count_characters() {
        let index = LineIndex::new("x ← 1");
        // The arrow is three bytes but one column.
        assert_eq!(index.position(6).column, 5);
    }

    #[test]
    fn test_line_text() {
        let index = LineIndex::new("first\r\nsecond");
        assert_eq!(index.line_text(1), Some("first"));
        assert_eq!(index.line_text(2), Some("second"));
        assert_eq!(index.line_text(3), None);
    }

    #[test]
    fn test_merge() {
        let index = LineIndex::new("abc def");
        let a = index.span(0, 3);
        let b = index.span(4, 7);
        let merged = a.merge(&b);
        assert_eq!(merged.start.offset, 0);
        assert_eq!(merged.end.offset, 7);
    }
}
