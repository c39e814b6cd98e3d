//! Placeholders, argument lists and embedded expressions
//!
//! The [`Lexer`] pairs the cursor with the active start-token matchers and
//! reads the structured pieces of a template: dotted names, `$placeholder`
//! chunks, call and definition argument lists and free-form expressions that
//! stop at a directive end token, a line end or a chosen Python token.
//!
//! Enclosures are tracked as `(opener, offset)` pairs so that unbalanced
//! input is reported at the opener rather than wherever scanning gave up.

use super::comprehension;
use super::matchers::{closer_for, is_closer, is_opener, opener_for, TokenMatchers};
use super::reader::SourceReader;
use super::scanner::{is_ident_char, is_ident_start, scan_token, PyTokenKind};
use crate::config::compile_time::lexical::MAX_ENCLOSURE_DEPTH;
use crate::config::CompilerSettings;
use crate::syntax::error::{ParseError, ParseFault, ParseResult};
use crate::tokens::{Argument, Expression, NameChunk, VarRef};

type Enclosures = Vec<(char, usize)>;

/// Whitespace kept verbatim inside expressions
const EXPRESSION_WS: [char; 3] = [' ', '\t', '\u{c}'];

/// Whitespace kept verbatim inside call argument strings
const CALL_ARG_WS: [char; 5] = [' ', '\t', '\u{c}', '\r', '\n'];

pub const LONG_FORM_IN_EXPRESSION: &str = "Long-form placeholders - ${}, $(), $[], etc. are not valid \
     inside expressions. Use them in top-level $placeholders only.";

pub const INVALID_PLACEHOLDER: &str = "Invalid placeholder.  Valid placeholders are $x or ${x}.";

/// How far an expression scan runs
#[derive(Debug, Clone, Copy)]
pub struct ExpressionOptions {
    /// Stop once the first enclosure opened by the scan is closed
    pub enclosed: bool,
    /// Python tokens that end the expression outside enclosures; the
    /// breaking token is left unread
    pub break_at: &'static [&'static str],
    /// Whether `$placeholders` are recognized
    pub allow_vars: bool,
}

impl Default for ExpressionOptions {
    fn default() -> Self {
        Self {
            enclosed: false,
            break_at: &[],
            allow_vars: true,
        }
    }
}

impl ExpressionOptions {
    pub fn enclosed() -> Self {
        Self {
            enclosed: true,
            ..Self::default()
        }
    }

    pub fn breaking_at(tokens: &'static [&'static str]) -> Self {
        Self {
            break_at: tokens,
            ..Self::default()
        }
    }

    pub fn without_vars(mut self) -> Self {
        self.allow_vars = false;
        self
    }
}

/// A top-level placeholder: its expression, raw source text and the
/// location of its start token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub expr: Expression,
    pub raw: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone)]
pub struct Lexer {
    pub reader: SourceReader,
    pub matchers: TokenMatchers,
    open_enclosures: usize,
}

impl Lexer {
    pub fn new(source: &str, settings: &CompilerSettings) -> Self {
        Self {
            reader: SourceReader::new(source),
            matchers: TokenMatchers::from_settings(settings),
            open_enclosures: 0,
        }
    }

    // ============================================================================
    // DIAGNOSTICS
    // ============================================================================

    pub fn error(&self, offset: usize, message: &str) -> ParseFault {
        ParseError::syntax(self.reader.source_map(), offset, message).into()
    }

    pub fn error_here(&self, message: &str) -> ParseFault {
        self.error(self.reader.pos(), message)
    }

    fn eof_error(&self, open: char, open_pos: usize) -> ParseFault {
        let message = format!(
            "EOF while searching for '{}' (to match '{}')",
            closer_for(open),
            open
        );
        self.error(open_pos, &message)
    }

    fn mismatched_error(&self, open: char, open_pos: usize, found: char, found_pos: usize) -> ParseFault {
        let message = format!(
            "Mismatched token. Found '{}' while searching for '{}'",
            found,
            closer_for(open)
        );
        let closer = self.reader.position_at(found_pos);
        ParseError::syntax(self.reader.source_map(), open_pos, &message)
            .with_closer(closer)
            .into()
    }

    fn open_enclosure(&mut self, pos: usize) -> ParseResult<()> {
        if self.open_enclosures >= MAX_ENCLOSURE_DEPTH {
            return Err(self.error(pos, "Maximum enclosure depth exceeded"));
        }
        self.open_enclosures += 1;
        Ok(())
    }

    fn close_enclosure(&mut self) {
        self.open_enclosures = self.open_enclosures.saturating_sub(1);
    }

    // ============================================================================
    // NAMES AND TOKENS
    // ============================================================================

    pub fn match_identifier(&self) -> bool {
        self.reader.peek().is_some_and(is_ident_start)
    }

    pub fn get_identifier(&mut self) -> ParseResult<String> {
        if !self.match_identifier() {
            return Err(self.error_here("Invalid identifier"));
        }
        let mut end = self.reader.pos() + 1;
        while end < self.reader.break_point() && is_ident_char(self.reader.src()[end]) {
            end += 1;
        }
        Ok(self.reader.read_to(end)?)
    }

    /// Identifiers joined by periods. A period only belongs to the name when
    /// an identifier follows it.
    pub fn get_dotted_name(&mut self) -> ParseResult<String> {
        let mut name = self.get_identifier()?;
        while self.reader.peek() == Some('.') && self.reader.peek_at(1).is_some_and(is_ident_start) {
            self.reader.advance(1)?;
            name.push('.');
            name.push_str(&self.get_identifier()?);
        }
        Ok(name)
    }

    fn read_py_token(&mut self) -> ParseResult<(PyTokenKind, String)> {
        let pos = self.reader.pos();
        let token = scan_token(self.reader.src(), pos, self.reader.break_point())
            .map_err(|error| ParseError::from_scan(self.reader.source_map(), pos, error))?;
        let text = self.reader.read_to(token.end)?;
        Ok((token.kind, text))
    }

    pub fn get_py_token(&mut self) -> ParseResult<String> {
        Ok(self.read_py_token()?.1)
    }

    /// Spaces, tabs and form feeds under the cursor
    pub fn get_expression_whitespace(&mut self) -> String {
        let mut end = self.reader.pos();
        while end < self.reader.break_point() && EXPRESSION_WS.contains(&self.reader.src()[end]) {
            end += 1;
        }
        self.reader.read_to(end).unwrap_or_default()
    }

    fn at_long_form_start(&self) -> bool {
        self.matchers.match_var_start_token(&self.reader)
            && self
                .reader
                .peek_at(self.matchers.var_start_len())
                .is_some_and(is_opener)
    }

    // ============================================================================
    // PLACEHOLDERS
    // ============================================================================

    /// A placeholder inside an expression. Its reported location is just
    /// past the start token.
    pub fn get_var(&mut self) -> ParseResult<VarRef> {
        let offset = self.reader.pos();
        self.reader.advance(self.matchers.var_start_len())?;
        let (line, column) = self.reader.row_col(self.reader.pos());
        let chunks = self.get_var_name_chunks()?;
        Ok(VarRef::new(chunks, offset, line, column))
    }

    /// Split a placeholder body into resolvable chunks.
    ///
    /// A dotted name followed by a call or subscript is split at its last
    /// period: the head is resolved on its own and the last segment carries
    /// the suffix. `$a.b.c[1].d().x.y.z` yields `a.b`, `c[1]`, `d()` and
    /// `x.y.z`.
    pub fn get_var_name_chunks(&mut self) -> ParseResult<Vec<NameChunk>> {
        let mut chunks = Vec::new();
        loop {
            match self.reader.peek() {
                Some(c) if chunks.is_empty() && is_ident_start(c) => {}
                Some('.') if !chunks.is_empty() && self.reader.peek_at(1).is_some_and(is_ident_start) => {
                    self.reader.advance(1)?;
                }
                _ if chunks.is_empty() => return Err(self.error_here("Invalid identifier")),
                _ => break,
            }

            let mut name = self.get_dotted_name()?;
            let mut suffix = Expression::new();
            let mut auto_call = true;

            if matches!(self.reader.peek(), Some('(' | '[')) {
                if let Some(period) = name.rfind('.') {
                    chunks.push(NameChunk::new(&name[..period], true, Expression::new()));
                    name = name[period + 1..].to_string();
                }
                while let Some(opener @ ('(' | '[')) = self.reader.peek() {
                    let part = if opener == '(' {
                        self.get_call_arg_string(true)?
                    } else {
                        self.scan_expression(ExpressionOptions::enclosed(), &mut Vec::new())?
                    };
                    suffix.extend(part);
                }
                auto_call = !suffix.to_string().starts_with('(');
            }
            chunks.push(NameChunk::new(name, auto_call, suffix));
        }
        Ok(chunks)
    }

    /// A placeholder in template text: `$name...` or `${name ...}`. The
    /// cursor must sit on the start token.
    pub fn get_placeholder(&mut self) -> ParseResult<Placeholder> {
        let start = self.reader.pos();
        let (line, column) = self.reader.row_col(start);
        self.reader.advance(self.matchers.var_start_len())?;

        let mut enclosures = Enclosures::new();
        match self.reader.peek() {
            Some('(' | '[') => return Err(self.error(start, INVALID_PLACEHOLDER)),
            Some('{') => {
                let pos = self.reader.pos();
                self.open_enclosure(pos)?;
                enclosures.push(('{', pos));
                self.reader.advance(1)?;
                if self.reader.peek().is_some_and(|c| c.is_whitespace()) {
                    return Err(self.error_here("Expected identifier"));
                }
            }
            _ => {}
        }

        let mut expr = Expression::new();
        if self.match_identifier() {
            let chunks = self.get_var_name_chunks()?;
            expr.push_var(VarRef::new(chunks, start, line, column));
            if !enclosures.is_empty() {
                expr.push_text(self.get_expression_whitespace());
                if self.reader.peek() == Some('}') {
                    self.reader.advance(1)?;
                    self.close_enclosure();
                } else {
                    let mut rest = self.scan_expression(ExpressionOptions::enclosed(), &mut enclosures)?;
                    rest.strip_suffix_char('}');
                    expr.extend(rest);
                }
            }
        } else if !enclosures.is_empty() {
            let mut rest = self.scan_expression(ExpressionOptions::enclosed(), &mut enclosures)?;
            rest.strip_suffix_char('}');
            expr.extend(rest);
        } else {
            return Err(self.error_here("Invalid identifier"));
        }

        comprehension::mark_locals(&mut expr);
        let raw = self.reader.slice(start, self.reader.pos());
        Ok(Placeholder {
            expr,
            raw,
            line,
            column,
        })
    }

    // ============================================================================
    // ARGUMENT LISTS
    // ============================================================================

    /// The argument string of a call, parentheses included. Placeholders are
    /// accepted as values but not as keyword names.
    pub fn get_call_arg_string(&mut self, allow_vars: bool) -> ParseResult<Expression> {
        let open_pos = self.reader.pos();
        self.open_enclosure(open_pos)?;
        self.reader.advance(1)?;
        let mut expr = Expression::from_text("(");

        loop {
            let Some(c) = self.reader.peek() else {
                return Err(self.eof_error('(', open_pos));
            };

            if is_closer(c) {
                if c != ')' {
                    return Err(self.mismatched_error('(', open_pos, c, self.reader.pos()));
                }
                self.reader.advance(1)?;
                expr.push_text(")");
                break;
            } else if CALL_ARG_WS.contains(&c) {
                self.reader.advance(1)?;
                expr.push_text(c.to_string());
            } else if allow_vars && self.matchers.match_var_start_token(&self.reader) {
                let var_pos = self.reader.pos();
                let var = self.get_var()?;
                let whitespace = self.get_expression_whitespace();
                expr.push_var(var);
                expr.push_text(whitespace);
                if self.reader.peek() == Some('=') {
                    let token = self.get_py_token()?;
                    if token == "=" {
                        return Err(self.error(
                            var_pos,
                            "Placeholders cannot be used as keyword argument names",
                        ));
                    }
                    expr.push_text(token);
                }
            } else if is_opener(c) {
                let options = ExpressionOptions {
                    allow_vars,
                    ..ExpressionOptions::enclosed()
                };
                let nested = self.scan_expression(options, &mut Vec::new())?;
                expr.extend(nested);
            } else {
                expr.push_text(self.get_py_token()?);
            }
        }

        self.close_enclosure();
        Ok(expr)
    }

    /// A parameter list of `#def` or `#super`: names, `*args`, `**kwargs`
    /// and default values. Defaults are plain Python and are stripped. The
    /// closing parenthesis is consumed.
    pub fn get_def_arg_list(&mut self) -> ParseResult<Vec<Argument>> {
        let open_pos = self.reader.pos();
        self.open_enclosure(open_pos)?;
        self.reader.advance(1)?;
        let mut args: Vec<Argument> = Vec::new();
        let mut on_default = false;

        loop {
            let Some(c) = self.reader.peek() else {
                return Err(self.eof_error('(', open_pos));
            };
            if c == ')' {
                self.reader.advance(1)?;
                break;
            }
            if self.matchers.match_directive_end(&self.reader) {
                return Err(self.eof_error('(', open_pos));
            }

            match c {
                ' ' | '\t' | '\u{c}' | '\r' | '\n' => {
                    if on_default {
                        push_default(&mut args, &c.to_string());
                    }
                    self.reader.advance(1)?;
                }
                '=' if !on_default => {
                    if args.is_empty() {
                        return Err(self.error_here("Expected an identifier."));
                    }
                    on_default = true;
                    self.reader.advance(1)?;
                    push_default(&mut args, "");
                }
                ',' => {
                    on_default = false;
                    self.reader.advance(1)?;
                }
                _ if on_default && is_opener(c) => {
                    let options = ExpressionOptions::enclosed().without_vars();
                    let nested = self.scan_expression(options, &mut Vec::new())?;
                    push_default(&mut args, &nested.text());
                }
                _ if on_default => {
                    let token = self.get_py_token()?;
                    push_default(&mut args, &token);
                }
                _ if self.matchers.match_var_start_token(&self.reader) => {
                    return Err(self.error_here("$ is not allowed here."));
                }
                _ if is_ident_start(c) => {
                    args.push(Argument::new(self.get_identifier()?));
                }
                '*' => {
                    let mut name = String::from("*");
                    self.reader.advance(1)?;
                    if self.reader.peek() == Some('*') {
                        name.push('*');
                        self.reader.advance(1)?;
                    }
                    if !self.match_identifier() {
                        return Err(self.error_here("Expected an identifier."));
                    }
                    name.push_str(&self.get_identifier()?);
                    args.push(Argument::new(name));
                }
                _ => {
                    let pos = self.reader.pos();
                    return Err(match scan_token(self.reader.src(), pos, self.reader.break_point()) {
                        Err(error) => ParseError::from_scan(self.reader.source_map(), pos, error).into(),
                        Ok(_) => self.error_here("Unexpected character."),
                    });
                }
            }
        }

        self.close_enclosure();
        for arg in &mut args {
            if let Some(default) = &mut arg.default {
                *default = default.trim().to_string();
            }
        }
        Ok(args)
    }

    // ============================================================================
    // EXPRESSIONS
    // ============================================================================

    /// Read an expression and flag the placeholders bound by its
    /// comprehensions
    pub fn get_expression(&mut self, options: ExpressionOptions) -> ParseResult<Expression> {
        let mut expr = self.scan_expression(options, &mut Vec::new())?;
        comprehension::mark_locals(&mut expr);
        Ok(expr)
    }

    /// An expression that must not contain placeholders. On failure the
    /// cursor is reset to the start and `message` is reported there.
    pub fn get_python_expression(&mut self, message: &str, options: ExpressionOptions) -> ParseResult<Expression> {
        let start = self.reader.pos();
        let expr = self.scan_expression(options, &mut Vec::new())?;
        if expr.has_vars() {
            self.reader.set_pos(start)?;
            return Err(self.error(start, message));
        }
        Ok(expr)
    }

    /// Core expression loop. `enclosures` may arrive non-empty when the
    /// caller already consumed an opener.
    fn scan_expression(&mut self, options: ExpressionOptions, enclosures: &mut Enclosures) -> ParseResult<Expression> {
        let start = self.reader.pos();
        let mut expr = Expression::new();

        loop {
            if options.enclosed
                && enclosures.is_empty()
                && (self.reader.pos() > start || !self.reader.peek().is_some_and(is_opener))
            {
                break;
            }

            let Some(c) = self.reader.peek() else {
                if let Some(&(open, open_pos)) = enclosures.last() {
                    return Err(self.eof_error(open, open_pos));
                }
                break;
            };
            let pos = self.reader.pos();

            if is_opener(c) {
                self.open_enclosure(pos)?;
                enclosures.push((c, pos));
                expr.push_text(c.to_string());
                self.reader.advance(1)?;
            } else if is_closer(c) {
                match enclosures.last().copied() {
                    Some((open, _)) if open == opener_for(c) => {
                        enclosures.pop();
                        self.close_enclosure();
                        expr.push_text(c.to_string());
                        self.reader.advance(1)?;
                    }
                    Some((open, open_pos)) => return Err(self.mismatched_error(open, open_pos, c, pos)),
                    None => expr.push_text(self.get_py_token()?),
                }
            } else if EXPRESSION_WS.contains(&c) {
                expr.push_text(self.get_expression_whitespace());
            } else if enclosures.is_empty() && self.matchers.match_directive_end(&self.reader) {
                break;
            } else if c == '\\' {
                match (self.reader.peek_at(1), self.reader.peek_at(2)) {
                    (Some('\r'), Some('\n')) => self.reader.advance(3)?,
                    (Some('\r' | '\n'), _) => self.reader.advance(2)?,
                    _ => return Err(self.error(pos, "Invalid Syntax")),
                }
            } else if c == '\r' || c == '\n' {
                if enclosures.is_empty() {
                    break;
                }
                expr.push_text(c.to_string());
                self.reader.advance(1)?;
            } else if options.allow_vars && self.matchers.match_var_in_expression(&self.reader) {
                let var = self.get_var()?;
                expr.push_var(var);
            } else if options.allow_vars && self.at_long_form_start() {
                return Err(self.error(pos, LONG_FORM_IN_EXPRESSION));
            } else {
                let (kind, token) = self.read_py_token()?;
                if enclosures.is_empty() && options.break_at.contains(&token.trim_start()) {
                    self.reader.set_pos(pos)?;
                    break;
                }
                let is_for = kind == PyTokenKind::Name && token.trim_start() == "for";
                expr.push_text(token);

                if kind == PyTokenKind::Name {
                    expr.push_text(self.get_expression_whitespace());
                    if is_for {
                        let lvalue_options = ExpressionOptions {
                            allow_vars: options.allow_vars,
                            ..ExpressionOptions::breaking_at(&["in"])
                        };
                        let lvalue = self.get_python_expression("lvalue of for must not contain a `$`", lvalue_options)?;
                        expr.extend(lvalue);
                    } else if self.reader.peek() == Some('(') {
                        let args = self.get_call_arg_string(options.allow_vars)?;
                        expr.extend(args);
                    }
                }
            }
        }

        Ok(expr)
    }
}

fn push_default(args: &mut [Argument], text: &str) {
    if let Some(last) = args.last_mut() {
        last.default.get_or_insert_with(String::new).push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::ExprPart;
    use assert_matches::assert_matches;

    fn lexer(text: &str) -> Lexer {
        Lexer::new(text, &CompilerSettings::default())
    }

    fn message(fault: ParseFault) -> (String, u32, u32) {
        match fault {
            ParseFault::Located(error) => (error.message.clone(), error.line(), error.column()),
            other => panic!("unlocated fault: {:?}", other),
        }
    }

    #[test]
    fn test_dotted_name_leaves_trailing_period() {
        let mut lex = lexer("foo.bar.baz. x");
        assert_eq!(lex.get_dotted_name().unwrap(), "foo.bar.baz");
        assert_eq!(lex.reader.peek(), Some('.'));
    }

    #[test]
    fn test_name_chunks_split_at_suffixes() {
        let mut lex = lexer("a.b.c[1].d().x.y.z rest");
        let chunks = lex.get_var_name_chunks().unwrap();
        let summary: Vec<(String, bool, String)> = chunks
            .iter()
            .map(|chunk| (chunk.name.clone(), chunk.auto_call, chunk.suffix.to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a.b".to_string(), true, String::new()),
                ("c".to_string(), true, "[1]".to_string()),
                ("d".to_string(), false, "()".to_string()),
                ("x.y.z".to_string(), true, String::new()),
            ]
        );
        assert_eq!(lex.reader.peek(), Some(' '));
    }

    #[test]
    fn test_consecutive_suffixes_share_a_chunk() {
        let mut lex = lexer("foo[1](2)");
        let chunks = lex.get_var_name_chunks().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].suffix.to_string(), "[1](2)");
        assert!(chunks[0].auto_call);
    }

    #[test]
    fn test_placeholder_short_and_long_form() {
        let mut lex = lexer("$foo.bar text");
        let placeholder = lex.get_placeholder().unwrap();
        assert_eq!(placeholder.raw, "$foo.bar");
        assert_eq!((placeholder.line, placeholder.column), (1, 1));

        let mut lex = lexer("${foo + 1} text");
        let placeholder = lex.get_placeholder().unwrap();
        assert_eq!(placeholder.raw, "${foo + 1}");
        assert_eq!(placeholder.expr.to_string(), "$foo + 1");
        assert_eq!(lex.reader.peek(), Some(' '));
    }

    #[test]
    fn test_placeholder_rejects_old_forms_and_leading_space() {
        assert_eq!(
            message(lexer("$(x)").get_placeholder().unwrap_err()),
            (INVALID_PLACEHOLDER.to_string(), 1, 1)
        );
        assert_eq!(
            message(lexer("${ foo }").get_placeholder().unwrap_err()),
            ("Expected identifier".to_string(), 1, 3)
        );
    }

    #[test]
    fn test_unclosed_and_mismatched_enclosures() {
        assert_eq!(
            message(lexer("${hai +").get_placeholder().unwrap_err()),
            ("EOF while searching for '}' (to match '{')".to_string(), 1, 2)
        );

        let fault = lexer("${a]").get_placeholder().unwrap_err();
        assert_matches!(&fault, ParseFault::Located(error) if error.closer.map(|p| p.column) == Some(4));
        assert_eq!(
            message(fault),
            ("Mismatched token. Found ']' while searching for '}'".to_string(), 1, 2)
        );

        assert_eq!(
            message(lexer("$foo(}").get_placeholder().unwrap_err()),
            ("Mismatched token. Found '}' while searching for ')'".to_string(), 1, 5)
        );
    }

    #[test]
    fn test_call_args_reject_keyword_placeholders() {
        assert_eq!(
            message(lexer("$foo($bar=$baz)").get_placeholder().unwrap_err()),
            (
                "Placeholders cannot be used as keyword argument names".to_string(),
                1,
                6
            )
        );
        assert_eq!(
            message(lexer("$herp(foo=${bar})").get_placeholder().unwrap_err()),
            ("Invalid identifier".to_string(), 1, 12)
        );

        let mut lex = lexer("$foo($bar == 1, x=$y)");
        let placeholder = lex.get_placeholder().unwrap();
        assert_eq!(placeholder.expr.to_string(), "$foo($bar == 1, x=$y)");
    }

    #[test]
    fn test_def_arg_list() {
        let mut lex = lexer("(a, b = [1, 2], *args, **kw) rest");
        let args = lex.get_def_arg_list().unwrap();
        assert_eq!(
            args,
            vec![
                Argument::new("a"),
                Argument::with_default("b", "[1, 2]"),
                Argument::new("*args"),
                Argument::new("**kw"),
            ]
        );
        assert_eq!(lex.reader.peek(), Some(' '));
    }

    #[test]
    fn test_def_arg_list_errors() {
        assert_eq!(
            message(lexer("($x)").get_def_arg_list().unwrap_err()),
            ("$ is not allowed here.".to_string(), 1, 2)
        );
        assert_eq!(
            message(lexer("(*1)").get_def_arg_list().unwrap_err()),
            ("Expected an identifier.".to_string(), 1, 3)
        );
        assert_eq!(
            message(lexer("(1)").get_def_arg_list().unwrap_err()),
            ("Unexpected character.".to_string(), 1, 2)
        );
        assert_eq!(
            message(lexer("(☃)").get_def_arg_list().unwrap_err()),
            ("Invalid Syntax".to_string(), 1, 2)
        );
        assert_eq!(
            message(lexer("(x,#\n").get_def_arg_list().unwrap_err()),
            ("EOF while searching for ')' (to match '(')".to_string(), 1, 1)
        );
        assert_eq!(
            message(lexer("(x=($y))").get_def_arg_list().unwrap_err()),
            ("Invalid Syntax".to_string(), 1, 5)
        );
    }

    #[test]
    fn test_expression_stops_at_directive_end_and_line_end() {
        let mut lex = lexer("x + $y# tail");
        let expr = lex.get_expression(ExpressionOptions::default()).unwrap();
        assert_eq!(expr.to_string(), "x + $y");
        assert_eq!(lex.reader.peek(), Some('#'));

        let mut lex = lexer("foo(1,\n 2) + 3\nnext");
        let expr = lex.get_expression(ExpressionOptions::default()).unwrap();
        assert_eq!(expr.to_string(), "foo(1,\n 2) + 3");
        assert_eq!(lex.reader.peek(), Some('\n'));
    }

    #[test]
    fn test_expression_break_token_is_left_unread() {
        let mut lex = lexer("for x in y: body");
        let expr = lex.get_expression(ExpressionOptions::breaking_at(&[":"])).unwrap();
        assert_eq!(expr.to_string(), "for x in y");
        assert_eq!(lex.reader.peek(), Some(':'));
    }

    #[test]
    fn test_backslash_continuation() {
        let mut lex = lexer("a + \\\nb");
        let expr = lex.get_expression(ExpressionOptions::default()).unwrap();
        assert_eq!(expr.to_string(), "a + b");

        let fault = lexer("a + \\hi").get_expression(ExpressionOptions::default()).unwrap_err();
        assert_eq!(message(fault), ("Invalid Syntax".to_string(), 1, 5));
    }

    #[test]
    fn test_for_lvalue_must_be_plain() {
        let fault = lexer("for $x in y").get_expression(ExpressionOptions::default()).unwrap_err();
        assert_eq!(
            message(fault),
            ("lvalue of for must not contain a `$`".to_string(), 1, 5)
        );
    }

    #[test]
    fn test_long_form_inside_expression() {
        let fault = lexer("x + ${y}").get_expression(ExpressionOptions::default()).unwrap_err();
        assert_eq!(message(fault), (LONG_FORM_IN_EXPRESSION.to_string(), 1, 5));
    }

    #[test]
    fn test_vars_disallowed_scan_as_python() {
        let fault = lexer("1 + $bar")
            .get_expression(ExpressionOptions::default().without_vars())
            .unwrap_err();
        assert_eq!(message(fault), ("Invalid Syntax".to_string(), 1, 5));
    }

    #[test]
    fn test_in_expression_var_location_is_after_start_token() {
        let mut lex = lexer("x + $foo");
        let expr = lex.get_expression(ExpressionOptions::default()).unwrap();
        let var = expr.vars().next().unwrap();
        assert_eq!((var.offset, var.line, var.column), (4, 1, 6));
        assert_matches!(expr.parts.first(), Some(ExprPart::Text(text)) if text == "x + ");
    }
}
