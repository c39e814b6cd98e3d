//! Cursor over immutable template text
//!
//! The reader owns the current position and an adjustable end boundary (the
//! break point) used to parse a bounded sub-range such as the body of a
//! single-line directive. Every operation that moves the cursor is checked
//! against `[0, break_point]`.

use crate::utils::{Position, SourceMap};

/// Whitespace accepted between tokens on a single line
pub const WS_CHARS: [char; 2] = [' ', '\t'];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("pos ({pos}) is invalid: beyond the stream's end ({limit})")]
    BeyondEnd { pos: usize, limit: usize },

    #[error("New breakpoint ({pos}) is invalid: beyond the end of stream's source string ({len})")]
    BreakPointBeyondSource { pos: usize, len: usize },
}

#[derive(Debug, Clone)]
pub struct SourceReader {
    map: SourceMap,
    pos: usize,
    break_point: usize,
}

impl SourceReader {
    pub fn new(source: &str) -> Self {
        let map = SourceMap::new(source);
        let break_point = map.len();
        Self {
            map,
            pos: 0,
            break_point,
        }
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.map
    }

    /// The full source, ignoring the break point
    pub fn src(&self) -> &[char] {
        self.map.chars()
    }

    /// Length of the source
    pub fn src_len(&self) -> usize {
        self.map.len()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) -> Result<(), PositionError> {
        self.check_pos(pos)?;
        self.pos = pos;
        Ok(())
    }

    fn check_pos(&self, pos: usize) -> Result<(), PositionError> {
        if pos > self.break_point {
            return Err(PositionError::BeyondEnd {
                pos,
                limit: self.break_point.saturating_sub(1),
            });
        }
        Ok(())
    }

    pub fn break_point(&self) -> usize {
        self.break_point
    }

    pub fn set_break_point(&mut self, pos: usize) -> Result<(), PositionError> {
        if pos > self.src_len() {
            return Err(PositionError::BreakPointBeyondSource {
                pos,
                len: self.src_len(),
            });
        }
        self.break_point = pos;
        Ok(())
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.break_point
    }

    /// Character under the cursor, `None` at the break point
    pub fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    /// Character `offset` places past the cursor, `None` at or past the
    /// break point
    pub fn peek_at(&self, offset: usize) -> Option<char> {
        let pos = self.pos + offset;
        if pos < self.break_point {
            self.src().get(pos).copied()
        } else {
            None
        }
    }

    pub fn getc(&mut self) -> Result<char, PositionError> {
        let c = self.peek().ok_or(PositionError::BeyondEnd {
            pos: self.pos + 1,
            limit: self.break_point.saturating_sub(1),
        })?;
        self.pos += 1;
        Ok(c)
    }

    pub fn advance(&mut self, offset: usize) -> Result<(), PositionError> {
        self.set_pos(self.pos + offset)
    }

    /// Move the cursor to `to` and return the text passed over
    pub fn read_to(&mut self, to: usize) -> Result<String, PositionError> {
        let start = self.pos;
        self.read_range(start, to)
    }

    /// Move the cursor to `to` and return `src[start..to]`
    pub fn read_range(&mut self, start: usize, to: usize) -> Result<String, PositionError> {
        self.check_pos(to)?;
        self.pos = to;
        Ok(self.slice(start, to))
    }

    /// Read to the end of the current line, including the terminator when
    /// `gobble` is set
    pub fn read_to_eol(&mut self, gobble: bool) -> Result<String, PositionError> {
        let to = self.find_eol(gobble);
        self.read_to(to)
    }

    /// Offset of the next line terminator (or of the end of the source).
    /// With `gobble` the offset just past the terminator is returned.
    pub fn find_eol(&self, gobble: bool) -> usize {
        self.find_eol_from(self.pos, gobble)
    }

    pub fn find_eol_from(&self, from: usize, gobble: bool) -> usize {
        let src = self.src();
        let mut pos = from.min(src.len());
        while pos < src.len() && src[pos] != '\n' && src[pos] != '\r' {
            pos += 1;
        }
        if !gobble {
            return pos;
        }
        match src.get(pos) {
            Some('\r') if src.get(pos + 1) == Some(&'\n') => pos + 2,
            Some(_) => pos + 1,
            None => pos,
        }
    }

    /// Offset of the first character of the line containing `pos`
    pub fn find_bol(&self, pos: usize) -> usize {
        let src = self.src();
        let mut bol = pos.min(src.len());
        while bol > 0 && src[bol - 1] != '\n' && src[bol - 1] != '\r' {
            bol -= 1;
        }
        bol
    }

    /// True when only whitespace sits between the start of the line and `pos`
    pub fn is_line_clear_to_pos(&self, pos: usize) -> bool {
        let bol = self.find_bol(pos);
        self.src()[bol..pos].iter().all(|c| c.is_whitespace())
    }

    pub fn is_line_clear(&self) -> bool {
        self.is_line_clear_to_pos(self.pos)
    }

    pub fn starts_with(&self, token: &str) -> bool {
        self.starts_with_at(self.pos, token)
    }

    pub fn starts_with_at(&self, pos: usize, token: &str) -> bool {
        let src = self.src();
        let mut idx = pos;
        for expected in token.chars() {
            if src.get(idx) != Some(&expected) {
                return false;
            }
            idx += 1;
        }
        true
    }

    /// Offset of the first occurrence of `token` at or after `from`
    pub fn find(&self, token: &str, from: usize) -> Option<usize> {
        (from..self.src_len()).find(|&pos| self.starts_with_at(pos, token))
    }

    /// Consume up to `max` spaces and tabs (unbounded when `None`)
    pub fn get_whitespace(&mut self, max: Option<usize>) -> String {
        let start = self.pos;
        let limit = match max {
            Some(max) => self.break_point.min(self.pos + max),
            None => self.break_point,
        };
        while self.pos < limit && WS_CHARS.contains(&self.src()[self.pos]) {
            self.pos += 1;
        }
        self.slice(start, self.pos)
    }

    /// 1-based (row, column) of an offset
    pub fn row_col(&self, pos: usize) -> (u32, u32) {
        let position = self.map.position_at(pos);
        (position.line, position.column)
    }

    pub fn position(&self) -> Position {
        self.map.position_at(self.pos)
    }

    pub fn position_at(&self, pos: usize) -> Position {
        self.map.position_at(pos)
    }

    /// Text between two offsets of the full source
    pub fn slice(&self, start: usize, end: usize) -> String {
        let src = self.src();
        let end = end.min(src.len());
        let start = start.min(end);
        src[start..end].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_set_pos_respects_break_point() {
        let mut reader = SourceReader::new("abcdef");
        reader.set_break_point(3).unwrap();
        assert!(reader.set_pos(3).is_ok());
        assert!(reader.at_end());
        assert_matches!(reader.set_pos(4), Err(PositionError::BeyondEnd { pos: 4, .. }));
        assert_matches!(
            reader.set_break_point(7),
            Err(PositionError::BreakPointBeyondSource { pos: 7, len: 6 })
        );
    }

    #[test]
    fn test_peek_stops_at_break_point() {
        let mut reader = SourceReader::new("ab");
        assert_eq!(reader.peek(), Some('a'));
        assert_eq!(reader.peek_at(1), Some('b'));
        assert_eq!(reader.peek_at(2), None);
        reader.set_break_point(1).unwrap();
        assert_eq!(reader.peek_at(1), None);
        assert_eq!(reader.getc().unwrap(), 'a');
        assert!(reader.getc().is_err());
    }

    #[test]
    fn test_read_to_eol_with_and_without_gobble() {
        let mut reader = SourceReader::new("foo\r\nbar");
        assert_eq!(reader.read_to_eol(false).unwrap(), "foo");
        assert_eq!(reader.pos(), 3);
        reader.set_pos(0).unwrap();
        assert_eq!(reader.read_to_eol(true).unwrap(), "foo\r\n");
        assert_eq!(reader.pos(), 5);
        assert_eq!(reader.read_to_eol(true).unwrap(), "bar");
        assert!(reader.at_end());
    }

    #[test]
    fn test_find_bol_and_line_clear() {
        let reader = SourceReader::new("x\n   #if\nab#if");
        assert_eq!(reader.find_bol(5), 2);
        assert!(reader.is_line_clear_to_pos(5));
        assert_eq!(reader.find_bol(11), 9);
        assert!(!reader.is_line_clear_to_pos(11));
        assert!(reader.is_line_clear_to_pos(9));
    }

    #[test]
    fn test_get_whitespace_honours_maximum() {
        let mut reader = SourceReader::new(" \t  x");
        assert_eq!(reader.get_whitespace(Some(1)), " ");
        assert_eq!(reader.get_whitespace(None), "\t  ");
        assert_eq!(reader.get_whitespace(None), "");
        assert_eq!(reader.peek(), Some('x'));
    }

    #[test]
    fn test_row_col_on_terminators() {
        let reader = SourceReader::new("ab\ncd");
        assert_eq!(reader.row_col(2), (1, 3));
        assert_eq!(reader.row_col(3), (2, 1));
        assert_eq!(reader.row_col(5), (2, 3));
    }

    #[test]
    fn test_find_and_starts_with() {
        let reader = SourceReader::new("#end if");
        assert!(reader.starts_with("#end"));
        assert!(reader.starts_with_at(5, "if"));
        assert_eq!(reader.find("if", 0), Some(5));
        assert_eq!(reader.find("for", 0), None);
    }
}
