//! Source location tracking for the template compiler
//!
//! Offsets are counted in characters, not bytes, so that columns reported to
//! template authors match what an editor shows. Line tables are computed once
//! per source and answer row/column queries with a binary search.
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in source text with line, column, and character offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Character offset from start of input (0-based)
    pub offset: usize,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
}

impl Position {
    /// Create a new position
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Create the starting position (offset 0, line 1, column 1)
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span of source text from start to end position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
}

impl Span {
    /// Create a new span
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(
            start.offset <= end.offset,
            "Span start must not be after end"
        );
        Self { start, end }
    }

    /// Create a single-character span
    pub fn single(pos: Position) -> Self {
        let end = Position {
            offset: pos.offset + 1,
            line: pos.line,
            column: pos.column + 1,
        };
        Self { start: pos, end }
    }

    /// Character length of this span
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{}-{}",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Number of context lines shown on each side of a diagnostic.
const EXCERPT_CONTEXT_LINES: u32 = 3;

/// Source text plus precomputed line boundaries.
///
/// `line_starts[i]` is the offset of the first character of line `i + 1` and
/// `line_ends[i]` is the offset of its terminator (`\r\n`, `\r` or `\n`), or
/// the source length for an unterminated last line.
#[derive(Debug, Clone)]
pub struct SourceMap {
    chars: Vec<char>,
    line_starts: Vec<usize>,
    line_ends: Vec<usize>,
}

impl SourceMap {
    /// Create a new source map from source text
    pub fn new(source: &str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let mut line_starts = Vec::new();
        let mut line_ends = Vec::new();

        let mut pos = 0;
        while pos < chars.len() {
            line_starts.push(pos);
            let mut end = pos;
            while end < chars.len() && chars[end] != '\n' && chars[end] != '\r' {
                end += 1;
            }
            line_ends.push(end);
            pos = match chars.get(end) {
                Some('\r') if chars.get(end + 1) == Some(&'\n') => end + 2,
                Some(_) => end + 1,
                None => end,
            };
            if end == chars.len() {
                break;
            }
        }

        if line_starts.is_empty() {
            line_starts.push(0);
            line_ends.push(0);
        }

        Self {
            chars,
            line_starts,
            line_ends,
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Get the line and column for a character offset
    pub fn position_at(&self, offset: usize) -> Position {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let column = offset.saturating_sub(self.line_starts[line]);

        Position::new(offset, (line + 1) as u32, (column + 1) as u32)
    }

    /// Get a line of text by line number (1-based), without its terminator
    pub fn get_line(&self, line_num: u32) -> Option<String> {
        if line_num == 0 {
            return None;
        }
        let idx = (line_num - 1) as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self.line_ends[idx];
        Some(self.chars[start..end].iter().collect())
    }

    /// Render the diagnostic excerpt used by parse errors: the message, the
    /// location, up to three lines on either side and a caret under the
    /// offending column.
    pub fn render_excerpt(&self, position: Position, message: &str) -> String {
        let row = position.line;
        let col = position.column as usize;
        let last_row = self.line_count() as u32;

        let mut report = format!(
            "\n\n{}\nLine {}, column {}\n\nLine|Cheetah Code\n\
             ----|-------------------------------------------------------------\n",
            message, row, col
        );

        let first = row.saturating_sub(EXCERPT_CONTEXT_LINES).max(1);
        for prev in first..row {
            if let Some(line) = self.get_line(prev) {
                report.push_str(&format!("{:<4}|{}\n", prev, line));
            }
        }
        report.push_str(&format!(
            "{:<4}|{}\n",
            row,
            self.get_line(row).unwrap_or_default()
        ));
        report.push_str(&" ".repeat(5 + col.saturating_sub(1)));
        report.push_str("^\n");

        let last = (row + EXCERPT_CONTEXT_LINES).min(last_row);
        for next in (row + 1)..=last {
            if let Some(line) = self.get_line(next) {
                report.push_str(&format!("{:<4}|{}\n", next, line));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_tables_handle_all_terminators() {
        let map = SourceMap::new("ab\r\ncd\ref\ngh");
        assert_eq!(map.line_count(), 4);
        assert_eq!(map.get_line(1).as_deref(), Some("ab"));
        assert_eq!(map.get_line(2).as_deref(), Some("cd"));
        assert_eq!(map.get_line(3).as_deref(), Some("ef"));
        assert_eq!(map.get_line(4).as_deref(), Some("gh"));
        assert_eq!(map.get_line(5), None);
    }

    #[test]
    fn test_position_at_is_one_based() {
        let map = SourceMap::new("ab\ncd\n");
        assert_eq!(map.position_at(0), Position::new(0, 1, 1));
        assert_eq!(map.position_at(2), Position::new(2, 1, 3));
        assert_eq!(map.position_at(3), Position::new(3, 2, 1));
        assert_eq!(map.position_at(4), Position::new(4, 2, 2));
    }

    #[test]
    fn test_trailing_newline_adds_no_line() {
        let map = SourceMap::new("ab\n");
        assert_eq!(map.line_count(), 1);
        assert_eq!(SourceMap::new("").line_count(), 1);
    }

    #[test]
    fn test_columns_count_characters() {
        let map = SourceMap::new("☃☃x");
        assert_eq!(map.position_at(2).column, 3);
    }

    #[test]
    fn test_render_excerpt_window() {
        let map = SourceMap::new("1\n2\n3\n4\n$foo(\n6\n7\n8\n");
        let report = map.render_excerpt(map.position_at(12), "boom");
        assert_eq!(
            report,
            "\n\nboom\nLine 5, column 5\n\nLine|Cheetah Code\n\
             ----|-------------------------------------------------------------\n\
             2   |2\n3   |3\n4   |4\n5   |$foo(\n         ^\n6   |6\n7   |7\n8   |8\n"
        );
    }
}
