//! Python string literals for template text
//!
//! Literal text is written as a triple-quoted literal built from the Python
//! `repr` of the text, with escaped newlines turned back into real ones so
//! the generated module keeps the template's line structure.

/// Python 3 `repr` of a `str`
pub fn python_repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if is_printable(c) => out.push(c),
            c => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{:02x}", code));
                } else if code <= 0xffff {
                    out.push_str(&format!("\\u{:04x}", code));
                } else {
                    out.push_str(&format!("\\U{:08x}", code));
                }
            }
        }
    }
    out.push(quote);
    out
}

/// Approximation of `str.isprintable` for a single character: controls,
/// separators other than the plain space and format characters are escaped
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{ad}'
            | '\u{600}'..='\u{605}'
            | '\u{61c}'
            | '\u{6dd}'
            | '\u{70f}'
            | '\u{180e}'
            | '\u{200b}'..='\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206f}'
            | '\u{feff}'
            | '\u{fff9}'..='\u{fffb}'
            | '\u{e000}'..='\u{f8ff}'
            | '\u{f0000}'..='\u{10ffff}'
    )
}

/// Replace `\n` escapes preceded by an even number of backslashes with a
/// raw newline
fn unescape_newlines(body: &str) -> String {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let run_start = i;
        while i < chars.len() && chars[i] == '\\' {
            i += 1;
        }
        let run = i - run_start;
        if run % 2 == 1 && chars.get(i) == Some(&'n') {
            out.extend(std::iter::repeat('\\').take(run - 1));
            out.push('\n');
            i += 1;
        } else {
            out.extend(std::iter::repeat('\\').take(run));
        }
    }
    out
}

/// Triple-quoted literal decoding to exactly `text`
pub fn encode_literal(text: &str) -> String {
    let repr = python_repr(text);
    let double = repr.starts_with('"');
    let body = unescape_newlines(&repr[1..repr.len() - 1]);
    if double {
        format!("\"\"\"{}\"\"\"", body)
    } else {
        format!("'''{}'''", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_quote_choice() {
        assert_eq!(python_repr("abc"), "'abc'");
        assert_eq!(python_repr("it's"), "\"it's\"");
        assert_eq!(python_repr("say \"hi\""), "'say \"hi\"'");
        assert_eq!(python_repr("'\""), "'\\'\"'");
    }

    #[test]
    fn test_repr_escapes() {
        assert_eq!(python_repr("a\\b\tc\r\n"), "'a\\\\b\\tc\\r\\n'");
        assert_eq!(python_repr("\u{1}\u{7f}\u{a0}"), "'\\x01\\x7f\\xa0'");
        assert_eq!(python_repr("\u{2028}"), "'\\u2028'");
        assert_eq!(python_repr("☃é"), "'☃é'");
    }

    #[test]
    fn test_literal_keeps_real_newlines() {
        assert_eq!(encode_literal("Hello\nWorld\n"), "'''Hello\nWorld\n'''");
        assert_eq!(encode_literal("it's\n"), "\"\"\"it's\n\"\"\"");
    }

    /// Python's reading of a triple-quoted literal, for the escapes
    /// `python_repr` produces
    fn decode_literal(literal: &str) -> String {
        assert!(literal.starts_with("'''") || literal.starts_with("\"\"\""));
        let chars: Vec<char> = literal.chars().collect();
        let body = &chars[3..chars.len() - 3];
        let mut out = String::new();
        let mut i = 0;
        while i < body.len() {
            if body[i] != '\\' {
                out.push(body[i]);
                i += 1;
                continue;
            }
            let (c, width) = match body[i + 1] {
                'n' => ('\n', 2),
                'r' => ('\r', 2),
                't' => ('\t', 2),
                'x' => (hex_char(&body[i + 2..i + 4]), 4),
                'u' => (hex_char(&body[i + 2..i + 6]), 6),
                'U' => (hex_char(&body[i + 2..i + 10]), 10),
                other => (other, 2),
            };
            out.push(c);
            i += width;
        }
        out
    }

    fn hex_char(digits: &[char]) -> char {
        let text: String = digits.iter().collect();
        char::from_u32(u32::from_str_radix(&text, 16).unwrap()).unwrap()
    }

    #[test]
    fn test_literal_decodes_to_input() {
        let cases = [
            "",
            "plain",
            "it's",
            "say \"hi\"",
            "both ' and \"",
            "ends with quote'",
            "ends with dquote\"",
            "'''",
            "\"\"\"",
            "\\",
            "trailing backslash\\",
            "\\n literal",
            "\\\\n",
            "\r\n",
            "line\r\nbreak\rcr",
            "\n\n\n",
            "\t\u{0}\u{1b}\u{7f}",
            "\u{85}\u{a0}\u{2028}\u{feff}",
            "☃ é \u{1f600} \u{e000}",
            "mix '\\'\"\n\\\r",
        ];
        for text in cases {
            let literal = encode_literal(text);
            assert_eq!(decode_literal(&literal), text, "literal {:?}", literal);
            assert!(!literal.contains('\r'), "raw CR in {:?}", literal);
        }
    }

    #[test]
    fn test_escaped_backslash_before_n_is_kept() {
        // A literal backslash followed by `n` stays escaped
        assert_eq!(encode_literal("\\n"), "'''\\\\n'''");
        assert_eq!(encode_literal("\\\n"), "'''\\\\\n'''");
    }
}
