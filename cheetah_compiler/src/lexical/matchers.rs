//! Start-token recognition
//!
//! Tokens come from the compiler settings, so a `#compiler-settings` block can
//! change them mid-template; the parser rebuilds its matchers afterwards.
//! Every start token is ignored when the character before it is a backslash.

use super::reader::SourceReader;
use super::scanner::is_ident_start;
use crate::config::CompilerSettings;

const OPENERS: [char; 3] = ['{', '(', '['];
const CLOSERS: [char; 3] = ['}', ')', ']'];

/// Closing delimiter for an opener
pub fn closer_for(opener: char) -> char {
    match opener {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Opening delimiter for a closer
pub fn opener_for(closer: char) -> char {
    match closer {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

pub fn is_opener(c: char) -> bool {
    OPENERS.contains(&c)
}

pub fn is_closer(c: char) -> bool {
    CLOSERS.contains(&c)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatchers {
    pub var_start: String,
    pub comment_start: String,
    pub directive_start: String,
    pub directive_end: String,
    candidate_chars: Vec<char>,
}

impl TokenMatchers {
    pub fn from_settings(settings: &CompilerSettings) -> Self {
        let var_start = settings.cheetah_var_start_token();
        let comment_start = settings.comment_start_token();
        let directive_start = settings.directive_start_token();
        let directive_end = settings.directive_end_token();
        let candidate_chars = [&comment_start, &var_start, &directive_start]
            .iter()
            .filter_map(|token| token.chars().next())
            .collect();

        Self {
            var_start,
            comment_start,
            directive_start,
            directive_end,
            candidate_chars,
        }
    }

    fn is_escaped(reader: &SourceReader, pos: usize) -> bool {
        pos > 0 && reader.src()[pos - 1] == '\\'
    }

    fn token_at(reader: &SourceReader, pos: usize, token: &str) -> bool {
        !token.is_empty()
            && !Self::is_escaped(reader, pos)
            && pos + token.chars().count() <= reader.break_point()
            && reader.starts_with_at(pos, token)
    }

    fn char_at(reader: &SourceReader, pos: usize) -> Option<char> {
        if pos < reader.break_point() {
            reader.src().get(pos).copied()
        } else {
            None
        }
    }

    /// Whether the character under the cursor could start anything other
    /// than plain text
    pub fn is_candidate(&self, reader: &SourceReader) -> bool {
        reader
            .peek()
            .is_some_and(|c| self.candidate_chars.contains(&c))
    }

    pub fn match_comment_start(&self, reader: &SourceReader) -> bool {
        Self::token_at(reader, reader.pos(), &self.comment_start)
    }

    /// `$`, an optional opener and whitespace, then an identifier start.
    /// Returns the offset just past the start token and opener.
    pub fn match_variable_placeholder_start(&self, reader: &SourceReader) -> Option<usize> {
        let pos = reader.pos();
        if !Self::token_at(reader, pos, &self.var_start) {
            return None;
        }
        let mut cursor = pos + self.var_start.chars().count();
        if Self::char_at(reader, cursor).is_some_and(is_opener) {
            cursor += 1;
            while matches!(Self::char_at(reader, cursor), Some(' ' | '\t' | '\u{c}')) {
                cursor += 1;
            }
        }
        Self::char_at(reader, cursor)
            .is_some_and(is_ident_start)
            .then_some(cursor)
    }

    /// `$`, an opener, whitespace, then anything but a closer
    pub fn match_expression_placeholder_start(&self, reader: &SourceReader) -> bool {
        let pos = reader.pos();
        if !Self::token_at(reader, pos, &self.var_start) {
            return false;
        }
        let mut cursor = pos + self.var_start.chars().count();
        if !Self::char_at(reader, cursor).is_some_and(is_opener) {
            return false;
        }
        cursor += 1;
        while matches!(Self::char_at(reader, cursor), Some(' ' | '\t' | '\u{c}')) {
            cursor += 1;
        }
        Self::char_at(reader, cursor).is_some_and(|c| !is_closer(c))
    }

    /// A placeholder inside an expression: `$` directly followed by an
    /// identifier start. No escape check applies here.
    pub fn match_var_in_expression(&self, reader: &SourceReader) -> bool {
        let pos = reader.pos();
        reader.starts_with(&self.var_start)
            && Self::char_at(reader, pos + self.var_start.chars().count())
                .is_some_and(is_ident_start)
    }

    /// The placeholder start token wherever it appears unescaped
    pub fn match_var_start_token(&self, reader: &SourceReader) -> bool {
        Self::token_at(reader, reader.pos(), &self.var_start)
    }

    /// Offset past the directive start token when a directive begins at
    /// `pos` (the token followed by a letter, `_` or `@`)
    pub fn match_directive_start_at(&self, reader: &SourceReader, pos: usize) -> Option<usize> {
        if !Self::token_at(reader, pos, &self.directive_start) {
            return None;
        }
        let after = pos + self.directive_start.chars().count();
        Self::char_at(reader, after)
            .is_some_and(|c| is_ident_start(c) || c == '@')
            .then_some(after)
    }

    pub fn match_directive_end(&self, reader: &SourceReader) -> bool {
        Self::token_at(reader, reader.pos(), &self.directive_end)
    }

    pub fn directive_start_len(&self) -> usize {
        self.directive_start.chars().count()
    }

    pub fn directive_end_len(&self) -> usize {
        self.directive_end.chars().count()
    }

    pub fn var_start_len(&self) -> usize {
        self.var_start.chars().count()
    }

    pub fn comment_start_len(&self) -> usize {
        self.comment_start.chars().count()
    }

    /// Whether `text` begins with the comment start token
    pub fn text_starts_with_comment(&self, text: &str) -> bool {
        !self.comment_start.is_empty() && text.starts_with(&self.comment_start)
    }
}

/// Raw directive name at `pos`: `[A-Za-z_][A-Za-z0-9_-]*` or `@` followed by
/// an identifier. Returns the name and the offset past it.
pub fn directive_name_at(reader: &SourceReader, pos: usize) -> Option<(String, usize)> {
    let src = reader.src();
    let limit = reader.break_point();
    let at = |i: usize| if i < limit { src.get(i).copied() } else { None };

    let (start, allow_dash) = match at(pos) {
        Some('@') => (pos + 1, false),
        Some(_) => (pos, true),
        None => return None,
    };
    if !at(start).is_some_and(is_ident_start) {
        return None;
    }
    let mut end = start + 1;
    while at(end).is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_dash && c == '-')) {
        end += 1;
    }
    Some((reader.slice(pos, end), end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matchers() -> TokenMatchers {
        TokenMatchers::from_settings(&CompilerSettings::default())
    }

    fn reader_at(text: &str, pos: usize) -> SourceReader {
        let mut reader = SourceReader::new(text);
        reader.set_pos(pos).unwrap();
        reader
    }

    #[test]
    fn test_variable_placeholder_start() {
        let m = matchers();
        assert_eq!(m.match_variable_placeholder_start(&reader_at("$foo", 0)), Some(1));
        assert_eq!(m.match_variable_placeholder_start(&reader_at("${ foo}", 0)), Some(3));
        assert_eq!(m.match_variable_placeholder_start(&reader_at("$1", 0)), None);
        assert_eq!(m.match_variable_placeholder_start(&reader_at("\\$foo", 1)), None);
    }

    #[test]
    fn test_expression_placeholder_start() {
        let m = matchers();
        assert!(m.match_expression_placeholder_start(&reader_at("${1 + 2}", 0)));
        assert!(m.match_expression_placeholder_start(&reader_at("$[x]", 0)));
        assert!(!m.match_expression_placeholder_start(&reader_at("$()", 0)));
        assert!(!m.match_expression_placeholder_start(&reader_at("$foo", 0)));
    }

    #[test]
    fn test_comment_and_directive_starts() {
        let m = matchers();
        assert!(m.match_comment_start(&reader_at("## hi", 0)));
        assert!(!m.match_comment_start(&reader_at("\\## hi", 1)));
        assert_eq!(m.match_directive_start_at(&reader_at("#if", 0), 0), Some(1));
        assert_eq!(m.match_directive_start_at(&reader_at("#@dec", 0), 0), Some(1));
        assert_eq!(m.match_directive_start_at(&reader_at("# if", 0), 0), None);
        assert_eq!(m.match_directive_start_at(&reader_at("\\#if", 1), 1), None);
    }

    #[test]
    fn test_directive_names() {
        let reader = SourceReader::new("#compiler-settings\n#@classmethod #end if");
        assert_eq!(
            directive_name_at(&reader, 1),
            Some(("compiler-settings".to_string(), 18))
        );
        assert_eq!(directive_name_at(&reader, 20), Some(("@classmethod".to_string(), 32)));
        assert_eq!(directive_name_at(&reader, 34), Some(("end".to_string(), 37)));
        assert_eq!(directive_name_at(&reader, 18), None);
    }

    #[test]
    fn test_candidate_chars() {
        let m = matchers();
        assert!(m.is_candidate(&reader_at("$x", 0)));
        assert!(m.is_candidate(&reader_at("#x", 0)));
        assert!(!m.is_candidate(&reader_at("x", 0)));
    }

    #[test]
    fn test_var_in_expression() {
        let m = matchers();
        assert!(m.match_var_in_expression(&reader_at("$foo", 0)));
        assert!(!m.match_var_in_expression(&reader_at("${foo}", 0)));
    }
}
