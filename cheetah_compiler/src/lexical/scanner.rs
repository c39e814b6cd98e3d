//! Maximal-munch tokenizer for embedded Python expressions
//!
//! The compiler never interprets embedded expressions. It only needs to know
//! where one Python token ends so that string literals, comments and numbers
//! are re-emitted untouched and brackets inside them are not mistaken for
//! enclosures. The alternatives are tried in the order the Python tokenizer
//! tries them; each alternative consumes as much as it can.

/// Multi-character operators, longest first
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "!=", "%=", "&=", "**", "*=", "+=", "-=", "->", "//", "/=",
    ":=", "<<", "<=", "==", ">=", ">>", "@=", "^=", "|=", "%", "&", "(", ")", "*", "+", ",", "-",
    ".", "/", ":", ";", "<", "=", ">", "@", "[", "]", "^", "{", "|", "}", "~",
];

const STRING_PREFIX_CHARS: [char; 8] = ['u', 'U', 'b', 'B', 'r', 'R', 'f', 'F'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("Invalid Syntax")]
    InvalidSyntax,

    #[error("Malformed triple-quoted string")]
    MalformedString,
}

impl ScanError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            ScanError::InvalidSyntax => crate::logging::codes::lexical::INVALID_SYNTAX,
            ScanError::MalformedString => crate::logging::codes::lexical::MALFORMED_STRING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyTokenKind {
    /// Backslash followed by a line terminator
    Continuation,
    /// Zero-width match at the end of input
    End,
    Comment,
    String,
    Number,
    Operator,
    Newline,
    Name,
}

/// One scanned token. `start` is where scanning began (leading spaces and
/// tabs belong to the token), `text_start` where the token proper begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyToken {
    pub kind: PyTokenKind,
    pub start: usize,
    pub text_start: usize,
    pub end: usize,
}

impl PyToken {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Scan one token of `src[..limit]` starting at `pos`
pub fn scan_token(src: &[char], pos: usize, limit: usize) -> Result<PyToken, ScanError> {
    let limit = limit.min(src.len());
    let at = |i: usize| if i < limit { Some(src[i]) } else { None };

    let mut text_start = pos;
    while matches!(at(text_start), Some(' ' | '\t' | '\u{c}')) {
        text_start += 1;
    }
    let token = |kind: PyTokenKind, end: usize| PyToken {
        kind,
        start: pos,
        text_start,
        end,
    };

    let Some(first) = at(text_start) else {
        return Ok(token(PyTokenKind::End, text_start));
    };

    if first == '\\' {
        return match (at(text_start + 1), at(text_start + 2)) {
            (Some('\n'), _) => Ok(token(PyTokenKind::Continuation, text_start + 2)),
            (Some('\r'), Some('\n')) => Ok(token(PyTokenKind::Continuation, text_start + 3)),
            _ => Err(ScanError::InvalidSyntax),
        };
    }

    if first == '#' {
        let mut end = text_start;
        while !matches!(at(end), None | Some('\r' | '\n')) {
            end += 1;
        }
        return Ok(token(PyTokenKind::Comment, end));
    }

    if let Some(end) = scan_triple_quoted(src, text_start, limit)? {
        return Ok(token(PyTokenKind::String, end));
    }

    if let Some(end) = scan_number(src, text_start, limit) {
        return Ok(token(PyTokenKind::Number, end));
    }

    match (first, at(text_start + 1)) {
        ('\n', _) => return Ok(token(PyTokenKind::Newline, text_start + 1)),
        ('\r', Some('\n')) => return Ok(token(PyTokenKind::Newline, text_start + 2)),
        _ => {}
    }

    for op in OPERATORS.iter() {
        if op
            .chars()
            .enumerate()
            .all(|(offset, expected)| at(text_start + offset) == Some(expected))
        {
            return Ok(token(PyTokenKind::Operator, text_start + op.chars().count()));
        }
    }

    if let Some(end) = scan_single_quoted(src, text_start, limit) {
        return Ok(token(PyTokenKind::String, end));
    }

    if is_word_char(first) {
        let mut end = text_start;
        while at(end).is_some_and(is_word_char) {
            end += 1;
        }
        return Ok(token(PyTokenKind::Name, end));
    }

    Err(ScanError::InvalidSyntax)
}

/// Length of a string prefix (`r`, `b`, `rb`, ...) at `pos` that is followed
/// by a quote character
fn string_prefix_len(src: &[char], pos: usize, limit: usize) -> Option<usize> {
    (0..=2).find(|&len| {
        let prefix_ok = (pos..pos + len)
            .all(|i| i < limit && STRING_PREFIX_CHARS.contains(&src[i]));
        prefix_ok && pos + len < limit && matches!(src[pos + len], '\'' | '"')
    })
}

/// A triple-quoted literal must find its exact closer; an opener without one
/// is fatal rather than falling back to a shorter match.
fn scan_triple_quoted(src: &[char], pos: usize, limit: usize) -> Result<Option<usize>, ScanError> {
    let Some(prefix) = string_prefix_len(src, pos, limit) else {
        return Ok(None);
    };
    let open = pos + prefix;
    let quote = src[open];
    if open + 3 > limit || src[open + 1] != quote || src[open + 2] != quote {
        return Ok(None);
    }

    let mut i = open + 3;
    while i + 3 <= limit {
        if src[i] == quote && src[i + 1] == quote && src[i + 2] == quote {
            return Ok(Some(i + 3));
        }
        i += 1;
    }
    Err(ScanError::MalformedString)
}

/// Single-line string; a backslash-newline continuation also ends the token
fn scan_single_quoted(src: &[char], pos: usize, limit: usize) -> Option<usize> {
    let prefix = string_prefix_len(src, pos, limit)?;
    let quote = src[pos + prefix];
    let mut i = pos + prefix + 1;
    while i < limit {
        match src[i] {
            '\n' => return None,
            '\\' => {
                let next = if i + 1 < limit { Some(src[i + 1]) } else { None };
                match next {
                    Some('\n') => return Some(i + 2),
                    Some('\r') if i + 2 < limit && src[i + 2] == '\n' => return Some(i + 3),
                    Some(_) => i += 2,
                    None => return None,
                }
            }
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn scan_digits(src: &[char], mut pos: usize, limit: usize, radix: u32) -> usize {
    while pos < limit {
        let separator = src[pos] == '_' && pos + 1 < limit && src[pos + 1].is_digit(radix);
        if !(src[pos].is_digit(radix) || separator) {
            break;
        }
        pos += 1;
    }
    pos
}

fn scan_number(src: &[char], pos: usize, limit: usize) -> Option<usize> {
    let at = |i: usize| if i < limit { Some(src[i]) } else { None };

    if at(pos) == Some('0') {
        let radix = match at(pos + 1) {
            Some('x' | 'X') => Some(16),
            Some('o' | 'O') => Some(8),
            Some('b' | 'B') => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            let mut digits = pos + 2;
            if at(digits) == Some('_') {
                digits += 1;
            }
            let end = scan_digits(src, digits, limit, radix);
            if end > digits {
                return Some(end);
            }
        }
    }

    let int_end = scan_digits(src, pos, limit, 10);
    let mut end = int_end;
    let mut is_number = int_end > pos;

    if at(end) == Some('.') {
        let frac_end = scan_digits(src, end + 1, limit, 10);
        if is_number || frac_end > end + 1 {
            is_number = true;
            end = frac_end;
        }
    }
    if !is_number {
        return None;
    }

    if matches!(at(end), Some('e' | 'E')) {
        let mut exp = end + 1;
        if matches!(at(exp), Some('+' | '-')) {
            exp += 1;
        }
        let exp_end = scan_digits(src, exp, limit, 10);
        if exp_end > exp {
            end = exp_end;
        }
    }

    if matches!(at(end), Some('j' | 'J')) {
        end += 1;
    }
    Some(end)
}

/// Tokens of `text` that carry meaning: names, numbers, strings and
/// operators. Layout tokens are dropped and untokenizable characters skipped.
pub fn significant_tokens(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        match scan_token(&chars, pos, chars.len()) {
            Ok(token) if token.kind == PyTokenKind::End => break,
            Ok(token) => {
                if !matches!(
                    token.kind,
                    PyTokenKind::Continuation | PyTokenKind::Comment | PyTokenKind::Newline
                ) {
                    tokens.push(chars[token.text_start..token.end].iter().collect());
                }
                pos = token.end.max(pos + 1);
            }
            Err(_) => pos += 1,
        }
    }
    tokens
}
