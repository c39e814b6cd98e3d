//! One generated method
//!
//! A [`MethodBuffer`] collects the body lines of one Python method, the
//! pending literal text not yet written out, the indentation level and the
//! scopes used to decide which placeholders render as plain names.

use super::literal::encode_literal;
use super::names::ScopeStack;
use super::{CodegenError, CodegenResult, INDENT};
use crate::tokens::Argument;

/// Indentation of statements directly inside a method body
const BODY_INDENT: usize = 2;

#[derive(Debug, Clone)]
pub struct MethodBuffer {
    name: String,
    initial_comment: String,
    args: Vec<Argument>,
    decorators: Vec<String>,
    chunks: Vec<String>,
    pending_text: Vec<String>,
    indent_level: usize,
    scopes: ScopeStack,
    is_generator: bool,
    has_return: bool,
    body: Option<String>,
}

impl MethodBuffer {
    pub fn new(name: impl Into<String>, args: Vec<Argument>, decorators: Vec<String>, initial_comment: impl Into<String>) -> Self {
        let scopes = ScopeStack::new(
            std::iter::once("self".to_string()).chain(args.iter().map(|arg| arg.bare_name().to_string())),
        );
        Self {
            name: name.into(),
            initial_comment: initial_comment.into(),
            args,
            decorators,
            chunks: Vec::new(),
            pending_text: Vec::new(),
            indent_level: BODY_INDENT,
            scopes,
            is_generator: false,
            has_return: false,
            body: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn is_generator(&self) -> bool {
        self.is_generator
    }

    /// Whether any statement or text has been emitted yet
    pub fn has_body(&self) -> bool {
        !self.chunks.is_empty() || self.pending_text.iter().any(|text| !text.is_empty())
    }

    // ============================================================================
    // INDENTATION AND SCOPES
    // ============================================================================

    pub fn indentation(&self) -> String {
        INDENT.repeat(self.indent_level)
    }

    /// Open a block: one more indentation level and a fresh scope
    pub fn indent(&mut self) {
        self.indent_level += 1;
        self.scopes.push();
    }

    pub fn dedent(&mut self) -> CodegenResult<()> {
        if self.indent_level == 0 {
            return Err(CodegenError::DedentBelowZero);
        }
        self.indent_level -= 1;
        self.scopes.pop();
        Ok(())
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn bind(&mut self, name: impl Into<String>) {
        self.scopes.bind(name);
    }

    pub fn bind_base(&mut self, name: impl Into<String>) {
        self.scopes.bind_base(name);
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.scopes.contains(name)
    }

    pub fn at_base_scope(&self) -> bool {
        self.scopes.at_base()
    }

    // ============================================================================
    // BODY
    // ============================================================================

    pub fn add_chunk(&mut self, chunk: &str) {
        self.commit_str_const();
        if chunk.is_empty() {
            self.chunks.push("\n".to_string());
        } else {
            self.chunks.push(format!("\n{}{}", self.indentation(), chunk));
        }
    }

    pub fn append_to_prev_chunk(&mut self, appendage: &str) {
        match self.chunks.last_mut() {
            Some(last) => last.push_str(appendage),
            None => self.chunks.push(appendage.to_string()),
        }
    }

    fn append_line_col_comment(&mut self, line: u32, column: u32) {
        self.append_to_prev_chunk(&format!(" # generated from line {}, col {}.", line, column));
    }

    pub fn add_write_chunk(&mut self, chunk: &str) {
        self.add_chunk(&format!("write({})", chunk));
    }

    /// Evaluate `code` and write its filtered value unless it is
    /// `NO_CONTENT`. Single-line raw text is quoted in a trailing comment.
    pub fn add_filtered_chunk(&mut self, code: &str, raw: Option<(&str, u32, u32)>) {
        match raw {
            Some((raw, line, column)) if !raw.is_empty() && !raw.contains(['\n', '\r']) => {
                self.add_chunk(&format!(
                    "_v = {} # {} on line {}, col {}",
                    code,
                    super::literal::python_repr(raw),
                    line,
                    column
                ));
            }
            _ => self.add_chunk(&format!("_v = {}", code)),
        }
        self.add_chunk("if _v is not NO_CONTENT: write(_filter(_v))");
    }

    pub fn add_placeholder(&mut self, code: &str, raw: &str, line: u32, column: u32) {
        self.add_filtered_chunk(code, Some((raw, line, column)));
        self.append_line_col_comment(line, column);
    }

    pub fn add_str_const(&mut self, text: &str) {
        self.pending_text.push(text.to_string());
    }

    /// Write out the pending literal text as one `write(...)` statement
    pub fn commit_str_const(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text: String = self.pending_text.drain(..).collect();
        if text.is_empty() {
            return;
        }
        let statement = format!("write({})", encode_literal(&text));
        self.chunks.push(format!("\n{}{}", self.indentation(), statement));
    }

    /// Drop pending whitespace back to the start of the current line
    pub fn handle_ws_before_directive(&mut self) {
        if let Some(last) = self.pending_text.last_mut() {
            let bol = last.rfind(['\n', '\r']).map(|index| index + 1).unwrap_or(0);
            last.truncate(bol);
        }
    }

    pub fn add_method_comment(&mut self, comment: &str) {
        self.add_chunk(&format!("#{}", comment));
    }

    /// `expr:` followed by a new block
    pub fn add_indenting_directive(&mut self, expr: &str, line: u32, column: u32) {
        self.add_chunk(&format!("{}:", expr));
        self.append_line_col_comment(line, column);
        self.indent();
    }

    /// A sibling clause: leave the previous block, then open the next one
    pub fn add_reindenting_directive(&mut self, expr: &str, line: u32, column: u32, dedent: bool) -> CodegenResult<()> {
        self.commit_str_const();
        if dedent {
            self.dedent()?;
        }
        self.add_indenting_directive(expr, line, column);
        Ok(())
    }

    pub fn add_return(&mut self, statement: &str) -> CodegenResult<()> {
        if self.is_generator {
            return Err(CodegenError::ReturnInGenerator);
        }
        self.add_chunk(statement);
        self.has_return = true;
        Ok(())
    }

    pub fn add_yield(&mut self, statement: &str) -> CodegenResult<()> {
        if self.has_return {
            return Err(CodegenError::YieldAfterReturn);
        }
        self.is_generator = true;
        self.add_chunk(statement);
        Ok(())
    }

    // ============================================================================
    // FINISHING
    // ============================================================================

    fn wrapper_line(level: usize, text: &str) -> String {
        if text.is_empty() {
            "\n".to_string()
        } else {
            format!("\n{}{}", INDENT.repeat(level), text)
        }
    }

    /// Close the body: commit pending text, add `**KWS` and wrap the body in
    /// the transaction setup and cleanup code
    pub fn finish(&mut self) {
        self.commit_str_const();
        if !self.args.iter().any(|arg| arg.name.trim().starts_with("**")) {
            self.args.push(Argument::new("**KWS"));
        }
        self.indent_level = BODY_INDENT;

        let line = Self::wrapper_line;
        let mut out = String::new();
        for piece in [
            line(2, &self.initial_comment),
            line(2, "trans = self.transaction"),
            line(2, "if not trans:"),
            line(3, "self.transaction = trans = DummyTransaction()"),
            line(3, "_dummyTrans = True"),
            line(2, "else:"),
            line(3, "_dummyTrans = False"),
            line(2, "write = trans.write"),
            line(2, "SL = self._CHEETAH__searchList"),
            line(2, "_filter = self._CHEETAH__currentFilter"),
            line(2, ""),
            line(2, "## START - generated method body"),
            line(2, ""),
        ] {
            out.push_str(&piece);
        }
        for chunk in self.chunks.drain(..) {
            out.push_str(&chunk);
        }
        out.push_str(&line(2, ""));
        out.push_str(&line(2, "## END - generated method body"));
        out.push_str(&line(2, ""));
        if !self.is_generator {
            for piece in [
                line(2, "if _dummyTrans:"),
                line(3, "self.transaction = None"),
                line(3, "return trans.getvalue()"),
                line(2, "else:"),
                line(3, "return NO_CONTENT"),
            ] {
                out.push_str(&piece);
            }
        }
        out.push_str(&line(2, ""));
        self.body = Some(out);
    }

    pub fn signature(&self) -> String {
        let mut out = String::new();
        for decorator in &self.decorators {
            out.push_str(INDENT);
            out.push_str(decorator);
            out.push('\n');
        }
        let args: Vec<String> = std::iter::once("self".to_string())
            .chain(self.args.iter().map(Argument::to_string))
            .collect();
        out.push_str(&format!("{}def {}({}):\n\n", INDENT, self.name, args.join(", ")));
        out
    }

    /// Full method source; the body is finished first if needed
    pub fn method_def(&mut self) -> String {
        if self.body.is_none() {
            self.finish();
        }
        let body = self.body.clone().unwrap_or_default();
        format!("{}\n{}", self.signature(), body)
    }
}
