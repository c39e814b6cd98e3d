//! Single-pass template parser
//!
//! The parser walks the template once, left to right, and drives the
//! [`CodeGenerator`] directly: literal text, comments, placeholders and
//! directives are recognized at the cursor and emitted as they are read.
//! Open block directives are tracked on an explicit stack so that every
//! `#end NAME` can be checked against the directive it closes.

use crate::codegen::{CodeGenerator, CodegenError};
use crate::config::compile_time::syntax::MAX_DIRECTIVE_DEPTH;
use crate::config::runtime::CompilerPreferences;
use crate::config::CompilerSettings;
use crate::grammar::{Directive, DirectiveHandlers, Handler, StandardHandlers};
use crate::lexical::{directive_name_at, ExpressionOptions, Lexer, TokenMatchers};
use crate::log_debug;
use crate::syntax::error::{ParseError, ParseFault, ParseResult};
use crate::tokens::{Argument, Expression};

const SETTINGS_RULE: &str = "---------------------------------------------";

pub struct Parser {
    lexer: Lexer,
    generator: CodeGenerator,
    open_directives: Vec<Directive>,
    handlers: Box<dyn DirectiveHandlers>,
    trace_directives: bool,
}

impl Parser {
    pub fn new(source: &str, settings: CompilerSettings) -> Self {
        Self {
            lexer: Lexer::new(source, &settings),
            generator: CodeGenerator::new(settings),
            open_directives: Vec::new(),
            handlers: Box::new(StandardHandlers),
            trace_directives: CompilerPreferences::default().trace_directives,
        }
    }

    /// Route directives through a custom handler table
    pub fn with_handlers(mut self, handlers: Box<dyn DirectiveHandlers>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_preferences(mut self, preferences: &CompilerPreferences) -> Self {
        self.trace_directives = preferences.trace_directives;
        self
    }

    /// Parse the whole template. The first error aborts the pass.
    pub fn parse(mut self) -> Result<CodeGenerator, ParseError> {
        match self.parse_range(None) {
            Ok(()) => Ok(self.generator),
            Err(fault) => {
                let cursor = self.lexer.reader.pos();
                Err(fault.locate(self.lexer.reader.source_map(), cursor))
            }
        }
    }

    /// Parse and assemble the Python module source
    pub fn compile(self) -> Result<String, ParseError> {
        Ok(self.parse()?.module_code())
    }

    // ============================================================================
    // MAIN LOOP
    // ============================================================================

    /// Parse up to `break_point`, or to the end of the source with an empty
    /// directive stack when no break point is given
    fn parse_range(&mut self, break_point: Option<usize>) -> ParseResult<()> {
        let saved = self.lexer.reader.break_point();
        if let Some(break_point) = break_point {
            self.lexer.reader.set_break_point(break_point)?;
        }

        while !self.lexer.reader.at_end() {
            if self.lexer.matchers.match_comment_start(&self.lexer.reader) {
                self.eat_comment()?;
            } else if self.match_placeholder_start() {
                let placeholder = self.lexer.get_placeholder()?;
                self.generator.add_placeholder(&placeholder)?;
            } else if let Some(directive) = self.match_directive()? {
                self.eat_directive(directive)?;
            } else {
                self.eat_plain_text()?;
            }
        }

        match break_point {
            None => self.assert_empty_stack(),
            Some(_) => Ok(self.lexer.reader.set_break_point(saved)?),
        }
    }

    fn match_placeholder_start(&self) -> bool {
        let matchers = &self.lexer.matchers;
        matchers.match_variable_placeholder_start(&self.lexer.reader).is_some()
            || matchers.match_expression_placeholder_start(&self.lexer.reader)
    }

    /// Directive starting at the cursor. A directive start token followed
    /// by an unknown name is an error.
    fn match_directive(&self) -> ParseResult<Option<Directive>> {
        let reader = &self.lexer.reader;
        let Some(after) = self.lexer.matchers.match_directive_start_at(reader, reader.pos()) else {
            return Ok(None);
        };
        let Some((name, _)) = directive_name_at(reader, after) else {
            return Ok(None);
        };
        match Directive::from_name(&name) {
            Some(directive) => Ok(Some(directive)),
            None => Err(ParseError::unknown_directive(reader.source_map(), after, &name).into()),
        }
    }

    fn top_level_match(&self) -> ParseResult<bool> {
        if !self.lexer.matchers.is_candidate(&self.lexer.reader) {
            return Ok(false);
        }
        Ok(self.lexer.matchers.match_comment_start(&self.lexer.reader)
            || self.match_placeholder_start()
            || self.match_directive()?.is_some())
    }

    fn eat_plain_text(&mut self) -> ParseResult<()> {
        let start = self.lexer.reader.pos();
        while !self.lexer.reader.at_end() && !self.top_level_match()? {
            self.lexer.reader.advance(1)?;
        }
        let text = self.lexer.reader.slice(start, self.lexer.reader.pos());
        let var_start = &self.lexer.matchers.var_start;
        let directive_start = &self.lexer.matchers.directive_start;
        let text = text
            .replace(&format!("\\{}", var_start), var_start)
            .replace(&format!("\\{}", directive_start), directive_start);
        self.generator.add_str_const(&text)?;
        Ok(())
    }

    fn eat_comment(&mut self) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        if line_clear {
            self.generator.handle_ws_before_directive()?;
        }
        let len = self.lexer.matchers.comment_start_len();
        self.lexer.reader.advance(len)?;
        let comment = self.lexer.reader.read_to_eol(line_clear)?;
        self.generator.add_comment(&comment)?;
        Ok(())
    }

    // ============================================================================
    // DIRECTIVE DISPATCH
    // ============================================================================

    fn eat_directive(&mut self, directive: Directive) -> ParseResult<()> {
        let handler = self.handlers.handler_for(directive);
        if self.trace_directives {
            let (line, column) = self.lexer.reader.row_col(self.lexer.reader.pos());
            log_debug!("Dispatching directive",
                "directive" => directive,
                "line" => line,
                "column" => column
            );
        }

        match handler {
            Handler::Expression { include_name } => self.eat_simple_expression(directive, include_name),
            Handler::Indenting => self.eat_indenting(directive),
            Handler::If => self.eat_if(),
            Handler::End => self.eat_end_directive(),
            Handler::Def => self.eat_def_or_block(Directive::Def),
            Handler::Block => self.eat_def_or_block(Directive::Block),
            Handler::Decorator => self.eat_decorator(),
            Handler::Attr => self.eat_attr(),
            Handler::Extends => self.eat_extends(),
            Handler::Implements => self.eat_implements(),
            Handler::Super => self.eat_super(),
            Handler::Slurp => self.eat_slurp(),
            Handler::CompilerSettings => self.eat_compiler_settings(),
        }
    }

    /// Skip the directive start token and the directive name
    fn advance_past_name(&mut self, directive: Directive) -> ParseResult<()> {
        let len = self.lexer.matchers.directive_start_len() + directive.as_str().chars().count();
        Ok(self.lexer.reader.advance(len)?)
    }

    /// Consume whatever follows a directive on its line: a trailing comment,
    /// the directive end token or the line break of a directive standing
    /// alone on its line
    fn eat_rest_of_directive_tag(&mut self, line_clear: bool, eol: usize) -> ParseResult<()> {
        let mut found_comment = false;
        if self.lexer.matchers.match_comment_start(&self.lexer.reader) {
            let pos = self.lexer.reader.pos();
            self.lexer.reader.advance(1)?;
            let directive = match self.match_directive() {
                Ok(directive) => directive,
                Err(fault) if fault.is_unknown_directive() => None,
                Err(fault) => return Err(fault),
            };
            self.lexer.reader.set_pos(pos)?;
            if directive.is_none() {
                found_comment = true;
                self.eat_comment()?;
            }
        }

        if !found_comment && self.lexer.matchers.match_directive_end(&self.lexer.reader) {
            let len = self.lexer.matchers.directive_end_len();
            self.lexer.reader.advance(len)?;
        } else if line_clear && matches!(self.lexer.reader.peek(), Some('\r' | '\n')) {
            self.lexer.reader.read_to_eol(true)?;
        }

        if line_clear && (self.lexer.reader.at_end() || self.lexer.reader.pos() > eol) {
            self.generator.handle_ws_before_directive()?;
        }
        Ok(())
    }

    fn push_directive(&mut self, directive: Directive) -> ParseResult<()> {
        if self.open_directives.len() >= MAX_DIRECTIVE_DEPTH {
            return Err(self.lexer.error_here("Maximum directive nesting depth exceeded"));
        }
        self.open_directives.push(directive);
        Ok(())
    }

    fn pop_directive(&mut self, directive: Directive, name_pos: usize) -> ParseResult<()> {
        match self.open_directives.pop() {
            None => Err(self.lexer.error_here("#end found, but nothing to end")),
            Some(open) if open == directive => Ok(()),
            Some(open) => {
                let message = format!("#end {} found, expected #end {}", directive, open);
                Err(self.lexer.error(name_pos, &message))
            }
        }
    }

    fn assert_empty_stack(&self) -> ParseResult<()> {
        if self.open_directives.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = self.open_directives.iter().map(|directive| directive.as_str()).collect();
        Err(self.missing_end_error(&names.join(", ")))
    }

    fn missing_end_error(&self, names: &str) -> ParseFault {
        let message = format!(
            "Some #directives are missing their corresponding #end ___ tag: {}",
            names
        );
        self.lexer.error_here(&message)
    }

    fn codegen_error_at(&self, offset: usize, error: CodegenError) -> ParseFault {
        ParseError::syntax(self.lexer.reader.source_map(), offset, &error.to_string())
            .with_code(error.error_code())
            .into()
    }

    /// A `:` that starts a body on the same line
    fn match_single_line_colon(&self) -> bool {
        let reader = &self.lexer.reader;
        if reader.peek() != Some(':') {
            return false;
        }
        let eol = reader.find_eol(false);
        let rest = reader.slice(reader.pos() + 1, eol);
        let rest = rest.trim();
        !rest.is_empty() && !self.lexer.matchers.text_starts_with_comment(rest)
    }

    // ============================================================================
    // STATEMENTS
    // ============================================================================

    /// `#pass`, `#return x`, `#import a`, `#py x = 1` and the like
    fn eat_simple_expression(&mut self, directive: Directive, include_name: bool) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        if include_name {
            let len = self.lexer.matchers.directive_start_len();
            self.lexer.reader.advance(len)?;
        } else {
            self.advance_past_name(directive)?;
        }
        let expr = self.lexer.get_expression(ExpressionOptions::default())?.trimmed();
        self.eat_rest_of_directive_tag(line_clear, eol)?;

        match directive {
            Directive::Import | Directive::From => self.generator.add_import(&expr.to_string())?,
            Directive::Py => self.generator.add_py(&expr)?,
            _ => self.generator.add_statement(directive, &expr)?,
        }
        Ok(())
    }

    fn eat_slurp(&mut self) -> ParseResult<()> {
        if self.lexer.reader.is_line_clear() {
            self.generator.handle_ws_before_directive()?;
        }
        self.generator.commit_str_const()?;
        self.lexer.reader.read_to_eol(true)?;
        Ok(())
    }

    // ============================================================================
    // CONTROL BLOCKS
    // ============================================================================

    fn open_block(&mut self, directive: Directive, expr: &Expression, line: u32, column: u32, dedent: bool) -> ParseResult<()> {
        if directive.is_reindenting() {
            self.generator.add_reindenting(directive, expr, line, column, dedent)?;
        } else {
            self.generator.add_indenting(directive, expr, line, column)?;
        }
        Ok(())
    }

    /// Body on the same line as its directive, up to the end of the line
    fn eat_single_line_body(&mut self) -> ParseResult<()> {
        self.lexer.reader.get_whitespace(Some(1));
        let eol = self.lexer.reader.find_eol(true);
        self.parse_range(Some(eol))?;
        self.generator.close_block_statement()?;
        Ok(())
    }

    fn eat_indenting(&mut self, directive: Directive) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        let (line, column) = self.lexer.reader.row_col(self.lexer.reader.pos());
        let len = self.lexer.matchers.directive_start_len();
        self.lexer.reader.advance(len)?;
        self.lexer.reader.get_whitespace(None);
        let expr = self.lexer.get_expression(ExpressionOptions::breaking_at(&[":"]))?;
        self.eat_block_start(directive, &expr, line_clear, eol, line, column)
    }

    fn eat_if(&mut self) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        let (line, column) = self.lexer.reader.row_col(self.lexer.reader.pos());
        let len = self.lexer.matchers.directive_start_len();
        self.lexer.reader.advance(len)?;
        let expr = self
            .lexer
            .get_expression(ExpressionOptions::breaking_at(&[":"]))?
            .trimmed();
        self.eat_block_start(Directive::If, &expr, line_clear, eol, line, column)
    }

    fn eat_block_start(
        &mut self,
        directive: Directive,
        expr: &Expression,
        line_clear: bool,
        eol: usize,
        line: u32,
        column: u32,
    ) -> ParseResult<()> {
        if self.match_single_line_colon() {
            self.lexer.reader.advance(1)?;
            self.open_block(directive, expr, line, column, false)?;
            return self.eat_single_line_body();
        }

        if self.lexer.reader.peek() == Some(':') {
            self.lexer.reader.advance(1)?;
        }
        self.lexer.reader.get_whitespace(None);
        self.eat_rest_of_directive_tag(line_clear, eol)?;
        if directive.is_closeable() {
            self.push_directive(directive)?;
        }
        self.open_block(directive, expr, line, column, true)
    }

    fn eat_end_directive(&mut self) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let len = self.lexer.matchers.directive_start_len() + Directive::End.as_str().len();
        self.lexer.reader.advance(len)?;
        self.lexer.reader.get_whitespace(None);

        let name_pos = self.lexer.reader.pos();
        let directive = directive_name_at(&self.lexer.reader, name_pos)
            .and_then(|(name, _)| Directive::closeable_from_name(&name))
            .ok_or_else(|| self.lexer.error_here("Invalid end directive"))?;
        let eol = self.lexer.reader.find_eol(false);
        self.lexer.get_expression(ExpressionOptions::default())?;
        self.eat_rest_of_directive_tag(line_clear, eol)?;
        self.pop_directive(directive, name_pos)?;

        match directive {
            Directive::Def => self.generator.close_def()?,
            Directive::Block => self.generator.close_block()?,
            _ => self.generator.close_block_statement()?,
        }
        Ok(())
    }

    // ============================================================================
    // METHODS
    // ============================================================================

    fn eat_decorator(&mut self) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        let len = self.lexer.matchers.directive_start_len();
        self.lexer.reader.advance(len)?;
        let expr = self.lexer.get_expression(ExpressionOptions::default())?.to_string();
        let decorator = expr.trim();
        if decorator == "@classmethod" || decorator == "@staticmethod" {
            let pos = self.lexer.reader.pos() - expr.chars().count();
            return Err(self.lexer.error(pos, "@classmethod / @staticmethod are not supported"));
        }
        self.generator.add_decorator(decorator);
        self.eat_rest_of_directive_tag(line_clear, eol)?;
        self.lexer.reader.get_whitespace(None);

        match self.match_directive()? {
            Some(Directive::Def | Directive::Block | Directive::Decorator) => Ok(()),
            _ => Err(self.lexer.error_here("Expected #def, #block or another @decorator")),
        }
    }

    fn eat_def_or_block(&mut self, directive: Directive) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        let start = self.lexer.reader.pos();
        self.advance_past_name(directive)?;
        self.lexer.reader.get_whitespace(None);

        if self.lexer.matchers.match_var_start_token(&self.lexer.reader) {
            return Err(self.lexer.error_here("use #def func() instead of #def $func()"));
        }
        let name = self.lexer.get_identifier()?;
        self.lexer.reader.get_whitespace(None);

        let opens_args = self.lexer.reader.peek() == Some('(');
        if directive == Directive::Block && opens_args {
            return Err(self.lexer.error_here("#block must not have an argspec, did you mean #def?"));
        }
        if directive == Directive::Def && !opens_args {
            return Err(self.lexer.error_here("#def must contain an argspec (at least ())"));
        }
        let (args, arglist_pos) = if directive == Directive::Def {
            let pos = self.lexer.reader.pos();
            (self.lexer.get_def_arg_list()?, Some(pos))
        } else {
            (Vec::new(), None)
        };
        let (line, column) = self.lexer.reader.row_col(start);

        if self.match_single_line_colon() {
            self.lexer.reader.getc()?;
            let comment = format!(
                "## Generated from {} at line {}, col {}.",
                self.lexer.reader.slice(start, eol),
                line,
                column
            );
            self.start_method(&name, args, &comment, arglist_pos)?;
            self.lexer.reader.get_whitespace(Some(1));
            self.parse_range(Some(eol))?;
            self.close_method(directive)?;
            return self.eat_rest_of_directive_tag(line_clear, eol);
        }

        if self.lexer.reader.peek() == Some(':') {
            self.lexer.reader.advance(1)?;
        }
        self.push_directive(directive)?;
        self.lexer.get_expression(ExpressionOptions::default())?;
        let signature = self.lexer.reader.slice(start, self.lexer.reader.pos());
        let signature = signature.lines().map(str::trim).collect::<Vec<_>>().join(" ");
        let eol = self.lexer.reader.find_eol(false);
        self.eat_rest_of_directive_tag(line_clear, eol)?;

        let comment = format!(
            "## CHEETAH: generated from {} at line {}, col {}.",
            signature, line, column
        );
        self.start_method(&name, args, &comment, arglist_pos)
    }

    fn start_method(&mut self, name: &str, args: Vec<Argument>, comment: &str, arglist_pos: Option<usize>) -> ParseResult<()> {
        match self.generator.start_method(name, args, comment) {
            Err(error @ CodegenError::DuplicateArguments(_)) => {
                let offset = arglist_pos.map_or(self.lexer.reader.pos(), |pos| pos + 1);
                Err(self.codegen_error_at(offset, error))
            }
            result => Ok(result?),
        }
    }

    fn close_method(&mut self, directive: Directive) -> ParseResult<()> {
        if directive == Directive::Block {
            self.generator.close_block()?;
        } else {
            self.generator.close_def()?;
        }
        Ok(())
    }

    fn eat_super(&mut self) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        self.advance_past_name(Directive::Super)?;
        self.lexer.reader.get_whitespace(None);
        let mut args = if self.lexer.reader.peek() == Some('(') {
            self.lexer.get_def_arg_list()?
        } else {
            Vec::new()
        };
        if args.first().is_some_and(|arg| arg.name == "self") {
            args.remove(0);
        }
        self.lexer.get_expression(ExpressionOptions::default())?;
        self.eat_rest_of_directive_tag(line_clear, eol)?;
        self.generator.add_super(&args)?;
        Ok(())
    }

    // ============================================================================
    // CLASS LEVEL
    // ============================================================================

    fn eat_attr(&mut self) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        self.advance_past_name(Directive::Attr)?;
        self.lexer.reader.get_whitespace(None);
        if self.lexer.matchers.match_var_start_token(&self.lexer.reader) {
            return Err(self.lexer.error_here("#attr directive must not contain `$`"));
        }
        let name = self.lexer.get_identifier()?;
        self.lexer.reader.get_whitespace(None);
        let operator_pos = self.lexer.reader.pos();
        if self.lexer.get_py_token()? != "=" {
            return Err(self.lexer.error(operator_pos, "Invalid Syntax"));
        }
        self.lexer.reader.get_whitespace(None);
        let expr = self.lexer.get_python_expression(
            "Invalid #attr directive. It should contain simple Python literals.",
            ExpressionOptions::default().without_vars(),
        )?;
        self.generator.add_attribute(&name, expr.text().trim());
        self.eat_rest_of_directive_tag(line_clear, eol)
    }

    fn eat_extends(&mut self) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        self.advance_past_name(Directive::Extends)?;
        self.lexer.reader.get_whitespace(None);
        let name = self.lexer.reader.read_to_eol(false)?;
        if name.contains(',') {
            return Err(self.lexer.error_here("yelp_cheetah does not support multiple inheritance"));
        }
        self.generator.set_base_class(name.trim())?;
        self.eat_rest_of_directive_tag(line_clear, eol)
    }

    fn eat_implements(&mut self) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        self.advance_past_name(Directive::Implements)?;
        self.lexer.reader.get_whitespace(None);
        let name = self.lexer.get_identifier()?;
        if self.lexer.reader.peek() == Some('(') {
            return Err(self.lexer.error_here("yelp_cheetah does not support argspecs for #implements"));
        }
        self.generator.set_main_method_name(&name);
        self.lexer.get_expression(ExpressionOptions::default())?;
        self.eat_rest_of_directive_tag(line_clear, eol)
    }

    fn eat_compiler_settings(&mut self) -> ParseResult<()> {
        let line_clear = self.lexer.reader.is_line_clear();
        let eol = self.lexer.reader.find_eol(false);
        self.advance_past_name(Directive::CompilerSettings)?;
        self.lexer.get_expression(ExpressionOptions::default())?;
        self.eat_rest_of_directive_tag(line_clear, eol)?;

        let settings = self.eat_to_end_of_settings()?;
        if let Err(error) = self.generator.update_settings_from_str(&settings) {
            let message = format!(
                "An error occurred while parsing the settings:\n{rule}\n{}\n{rule}",
                settings.trim(),
                rule = SETTINGS_RULE
            );
            let fault = ParseError::syntax(self.lexer.reader.source_map(), self.lexer.reader.pos(), &message)
                .with_code(error.error_code());
            return Err(fault.into());
        }
        self.lexer.matchers = TokenMatchers::from_settings(self.generator.settings());
        Ok(())
    }

    /// Raw text up to the matching `#end compiler-settings`, consuming the
    /// closing tag
    fn eat_to_end_of_settings(&mut self) -> ParseResult<String> {
        let name = Directive::CompilerSettings.as_str();
        let start = self.lexer.reader.pos();
        let (end_raw, final_pos, line_clear) = loop {
            if self.lexer.reader.at_end() {
                return Err(self.missing_end_error(name));
            }
            if matches!(self.match_directive(), Ok(Some(Directive::End))) {
                let raw = self.lexer.reader.pos();
                let len = self.lexer.matchers.directive_start_len() + Directive::End.as_str().len();
                self.lexer.reader.advance(len)?;
                self.lexer.reader.get_whitespace(None);
                if self.lexer.reader.starts_with(name) {
                    let line_clear = self.lexer.reader.is_line_clear_to_pos(raw);
                    let end_raw = if line_clear { self.lexer.reader.find_bol(raw) } else { raw };
                    self.lexer.reader.advance(name.chars().count())?;
                    self.lexer.reader.get_whitespace(None);
                    break (end_raw, self.lexer.reader.pos(), line_clear);
                }
                continue;
            }
            self.lexer.reader.advance(1)?;
        };

        let text = self.lexer.reader.slice(start, end_raw);
        self.lexer.reader.set_pos(final_pos)?;
        let eol = self.lexer.reader.find_eol(false);
        if self.lexer.matchers.match_directive_end(&self.lexer.reader) {
            let len = self.lexer.matchers.directive_end_len();
            self.lexer.reader.advance(len)?;
        } else if line_clear && matches!(self.lexer.reader.peek(), Some('\r' | '\n')) {
            self.lexer.reader.read_to_eol(true)?;
        }
        if line_clear && self.lexer.reader.pos() > eol {
            self.generator.handle_ws_before_directive()?;
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::error::ParseErrorKind;
    use assert_matches::assert_matches;

    fn compile(source: &str) -> String {
        Parser::new(source, CompilerSettings::default()).compile().unwrap()
    }

    fn error(source: &str) -> ParseError {
        Parser::new(source, CompilerSettings::default()).compile().unwrap_err()
    }

    fn assert_error(source: &str, message: &str, line: u32, column: u32) {
        let error = error(source);
        assert_eq!(error.message, message);
        assert_eq!((error.line(), error.column()), (line, column), "{}", error.report);
    }

    // ============================================================================
    // TEXT, COMMENTS AND PLACEHOLDERS
    // ============================================================================

    #[test]
    fn test_placeholders_and_text() {
        let code = compile("$a $b");
        assert!(code.contains("_v = VFFSL(SL, \"a\", False, False) # '$a' on line 1, col 1"));
        assert!(code.contains("\n        write(''' ''')"));
        assert!(code.contains("'$b' on line 1, col 4"));
        assert!(code.contains("write(_filter(_v)) # generated from line 1, col 4."));
    }

    #[test]
    fn test_escaped_tokens_are_literal() {
        let code = compile("\\$foo \\#bar");
        assert!(code.contains("write('''$foo #bar''')"));
        assert!(!code.contains("VFFSL(SL"));
    }

    #[test]
    fn test_comment() {
        let code = compile("## hello\nworld");
        assert!(code.contains("\n        # hello\n        write('''world''')"));
    }

    #[test]
    fn test_comprehension_target_is_local() {
        let code = compile("${[$obj.attr for obj in $objs]} $obj.attr");
        assert!(code.contains("[obj.attr for obj in VFFSL(SL, \"objs\", False, False)]"));
        assert!(code.contains("VFFSL(SL, \"obj.attr\", False, False)"));
    }

    #[test]
    fn test_compiles_deterministically() {
        let source = "#def f(x)\n$x\n#end def\n#for i in $items\n$f($i)\n#end for\n";
        assert_eq!(compile(source), compile(source));
    }

    // ============================================================================
    // CONTROL BLOCKS
    // ============================================================================

    #[test]
    fn test_for_loop() {
        let code = compile("#for i in range(3)\n$i\n#end for");
        assert!(code.contains(
            "\n        for i in range(3): # generated from line 1, col 1.\
             \n            _v = i # '$i' on line 2, col 1\
             \n            if _v is not NO_CONTENT: write(_filter(_v)) # generated from line 2, col 1.\
             \n            write('''\n''')"
        ));
    }

    #[test]
    fn test_directive_line_whitespace_is_gobbled() {
        let code = compile("  #if True\n  a\n  #end if\n");
        assert!(code.contains(
            "\n        if True: # generated from line 1, col 3.\n            write('''  a\n''')"
        ));
    }

    #[test]
    fn test_if_elif_else() {
        let code = compile("#if $x\na\n#else if $y\nb\n#else\nc\n#end if\n");
        assert!(code.contains("\n        if VFFSL(SL, \"x\", False, False): # generated from line 1, col 1."));
        assert!(code.contains("\n        elif VFFSL(SL, \"y\", False, False): # generated from line 3, col 1."));
        assert!(code.contains("\n        else: # generated from line 5, col 1."));
    }

    #[test]
    fn test_walrus_binds_only_when_always_assigned() {
        let code = compile("#if $a or (m := 1)\n$m\n#end if\n");
        assert!(code.contains("_v = VFFSL(SL, \"m\", False, False) # '$m' on line 2, col 1"));
        assert!(!code.contains("_v = m #"));

        let code = compile("#if (n := $a)\n$n\n#end if\n$n\n");
        assert!(code.contains("_v = n # '$n' on line 2, col 1"));
        assert!(code.contains("_v = n # '$n' on line 4, col 1"));

        let code = compile("#if $a\nx\n#elif (k := $b)\n$k\n#end if\n$k\n");
        assert!(code.contains("_v = k # '$k' on line 4, col 1"));
        assert!(code.contains("_v = VFFSL(SL, \"k\", False, False) # '$k' on line 6, col 1"));

        let code = compile("#silent (q := 2)\n$q\n");
        assert!(code.contains("_v = q # '$q' on line 2, col 1"));
    }

    #[test]
    fn test_single_line_if() {
        let code = compile("#if True: yes\nafter");
        assert!(code.contains(
            "\n        if True: # generated from line 1, col 1.\
             \n            write('''yes\n''')\
             \n        write('''after''')"
        ));
    }

    #[test]
    fn test_directive_end_token() {
        let code = compile("#if $x#yes#end if#");
        assert!(code.contains("if VFFSL(SL, \"x\", False, False): # generated from line 1, col 1."));
        assert!(code.contains("\n            write('''yes''')"));
    }

    #[test]
    fn test_trailing_comment_on_directive() {
        let code = compile("#if $x ## note\nyes\n#end if\n");
        assert!(code.contains(
            "\n        # note\n        if VFFSL(SL, \"x\", False, False): # generated from line 1, col 1.\
             \n            write('''yes\n''')"
        ));
    }

    #[test]
    fn test_exception_binding() {
        let code = compile("#try\n$x\n#except ValueError as e\n$e\n#end try\n");
        assert!(code.contains("\n        except ValueError as e: # generated from line 3, col 1."));
        assert!(code.contains("_v = e # '$e' on line 4, col 1"));
    }

    #[test]
    fn test_slurp() {
        let code = compile("x #slurp\ny");
        assert!(code.contains("write('''x ''')\n        write('''y''')"));
    }

    // ============================================================================
    // STATEMENTS
    // ============================================================================

    #[test]
    fn test_py_binds_names() {
        let code = compile("#py total = 1\n$total\n");
        assert!(code.contains("\n        total = 1\n"));
        assert!(code.contains("_v = total # '$total' on line 2, col 1"));
    }

    #[test]
    fn test_silent() {
        let code = compile("#silent $x\n");
        assert!(code.contains("\n        VFFSL(SL, \"x\", False, False)"));
    }

    #[test]
    fn test_import_is_hoisted() {
        let code = compile("#import os\n$os.sep\n");
        assert!(code.contains("\nimport os\n"));
        assert!(code.contains("_v = os.sep # '$os.sep' on line 2, col 1"));
    }

    #[test]
    fn test_return_in_generator() {
        let error = error("#def f()\n#yield 1\n#return 2\n#end def\n");
        assert_eq!(error.message, "#return is not allowed in a method that also uses #yield");
    }

    // ============================================================================
    // METHODS AND CLASS MEMBERS
    // ============================================================================

    #[test]
    fn test_def() {
        let mut generator = Parser::new("#def foo(x)\n$x\n#end def\n", CompilerSettings::default())
            .parse()
            .unwrap();
        assert_eq!(generator.method_names(), vec!["foo".to_string(), "respond".to_string()]);
        let code = generator.module_code();
        assert!(code.contains("def foo(self, x, **KWS):"));
        assert!(code.contains("## CHEETAH: generated from #def foo(x) at line 1, col 1."));
        assert!(code.contains("_v = x # '$x' on line 2, col 1"));
    }

    #[test]
    fn test_single_line_def() {
        let code = compile("#def foo(): hi\n");
        assert!(code.contains("## Generated from #def foo(): hi at line 1, col 1."));
        assert!(code.contains("write('''hi''')"));
    }

    #[test]
    fn test_block_is_called() {
        let code = compile("#block header\nhi\n#end block\n");
        assert!(code.contains("def header(self, **KWS):"));
        assert!(code.contains("## CHEETAH: generated from #block header at line 1, col 1."));
        assert!(code.contains("\n        self.header()"));
    }

    #[test]
    fn test_decorator() {
        let code = compile("#@dec\n#def foo(): hi\n");
        assert!(code.contains("    @dec\n    def foo(self, **KWS):"));
    }

    #[test]
    fn test_super() {
        let code = compile("#def foo(x)\n#super(x)\n#end def\n");
        assert!(code.contains("_v = super(YelpCheetahTemplate, self).foo(x)"));
    }

    #[test]
    fn test_attr() {
        let code = compile("#attr x = 1\n");
        let attributes = code.split("## CHEETAH GENERATED ATTRIBUTES").nth(1).unwrap();
        assert!(attributes.contains("\n    x = 1"));
    }

    #[test]
    fn test_extends_and_implements() {
        let code = compile("#extends foo.bar\n");
        assert!(code.contains("from foo.bar import bar as YelpCheetahBaseClass"));
        assert!(code.contains("def writeBody(self, **KWS):"));

        let code = compile("#implements render\nhi");
        assert!(code.contains("def render(self, **KWS):"));
    }

    #[test]
    fn test_compiler_settings() {
        let code = compile("#compiler-settings\nuseNameMapper = False\n#end compiler-settings\n$foo");
        assert!(code.contains("_v = foo # '$foo' on line 4, col 1"));

        let code = compile("#compiler-settings\ncheetahVarStartToken = @\n#end compiler-settings\n@foo $bar");
        assert!(code.contains("VFFSL(SL, \"foo\", False, False) # '@foo' on line 4, col 1"));
        assert!(code.contains("write(''' $bar''')"));
    }

    #[test]
    fn test_handler_override() {
        struct PassSlurps;
        impl DirectiveHandlers for PassSlurps {
            fn override_handler(&self, directive: Directive) -> Option<Handler> {
                (directive == Directive::Pass).then_some(Handler::Slurp)
            }
        }

        let code = Parser::new("a #pass\nb", CompilerSettings::default())
            .with_handlers(Box::new(PassSlurps))
            .compile()
            .unwrap();
        assert!(code.contains("write('''a ''')\n        write('''b''')"));
        assert!(compile("a #pass\nb").contains("\n        pass"));
    }

    // ============================================================================
    // ERRORS
    // ============================================================================

    #[test]
    fn test_unknown_directive() {
        let error = error("#bogus");
        assert_eq!(error.kind, ParseErrorKind::UnknownDirective);
        assert_eq!(
            error.message,
            "Bad directive name: \"bogus\". You may want to escape that # sign?"
        );
        assert_eq!((error.line(), error.column()), (1, 2));
    }

    #[test]
    fn test_unclosed_and_unmatched_ends() {
        assert_error(
            "#if True\n",
            "Some #directives are missing their corresponding #end ___ tag: if",
            1,
            9,
        );
        assert_error("#end if\n", "#end found, but nothing to end", 1, 8);
        assert_error("#end\n", "Invalid end directive", 1, 5);
        assert_error(
            "#if True\n#for i in range(5)\n#end if\n#end for\n",
            "#end if found, expected #end for",
            3,
            6,
        );
    }

    #[test]
    fn test_def_errors() {
        assert_error("#def\n", "Invalid identifier", 1, 5);
        assert_error("#def $foo()\n", "use #def func() instead of #def $func()", 1, 6);
        assert_error("#def foo\n", "#def must contain an argspec (at least ())", 1, 9);
        assert_error("#block foo(bar)\n", "#block must not have an argspec, did you mean #def?", 1, 11);
        assert_error("#def foo(self, bar)\n#end def\n", "Duplicate arguments: self", 1, 10);
        assert_error("#def foo(x,#\n", "EOF while searching for ')' (to match '(')", 1, 9);
    }

    #[test]
    fn test_class_level_errors() {
        assert_error(
            "#implements foo(bar)",
            "yelp_cheetah does not support argspecs for #implements",
            1,
            16,
        );
        assert_error(
            "#extends Cheetah.Template, object",
            "yelp_cheetah does not support multiple inheritance",
            1,
            33,
        );
        assert_error("#attr foo = $bar\n", "Invalid Syntax", 1, 13);
        assert_error("#attr $foo = \"hai\"", "#attr directive must not contain `$`", 1, 7);
        assert_error("#super(", "EOF while searching for ')' (to match '(')", 1, 7);
    }

    #[test]
    fn test_decorator_errors() {
        assert_error(
            "#@classmethod\n#def foo(bar)\n#end def\n",
            "@classmethod / @staticmethod are not supported",
            1,
            2,
        );
        assert_error("#@dec\njunk\n", "Expected #def, #block or another @decorator", 2, 1);
    }

    #[test]
    fn test_assign_to_placeholder() {
        assert_error("Hello\nWorld\n#py x = $y = 1\n", "cannot assign to a placeholder", 3, 9);
    }

    #[test]
    fn test_settings_errors() {
        let error = error("#compiler-settings\n==\n#end compiler-settings\n");
        assert_eq!(
            error.message,
            "An error occurred while parsing the settings:\n\
             ---------------------------------------------\n\
             ==\n\
             ---------------------------------------------"
        );
        assert_eq!((error.line(), error.column()), (3, 23));

        assert_error(
            "#compiler-settings\nuseNameMapper = False\n",
            "Some #directives are missing their corresponding #end ___ tag: compiler-settings",
            2,
            22,
        );
    }

    #[test]
    fn test_directive_depth_limit() {
        let source = "#if True\n".repeat(MAX_DIRECTIVE_DEPTH + 1);
        let error = error(&source);
        assert_eq!(error.message, "Maximum directive nesting depth exceeded");
        assert_matches!(error.kind, ParseErrorKind::Syntax);
    }
}
