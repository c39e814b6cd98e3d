//! Placeholder rendering and name binding analysis
//!
//! A placeholder is either resolved at runtime through the search list
//! (`VFFSL`/`VFN` calls, one per chunk) or emitted as a plain Python name
//! when its head is statically known in the generated method. The binding
//! helpers below extract the names a statement introduces so that later
//! placeholders can be rendered plainly.

use std::collections::BTreeSet;

use crate::config::CompilerSettings;
use crate::lexical::scanner::{is_ident_start, significant_tokens};
use crate::tokens::{ExprPart, Expression, VarRef};

/// Python builtins that never need a search-list lookup
pub const BUILTINS: &[&str] = &[
    "ArithmeticError", "AssertionError", "AttributeError", "BaseException", "BlockingIOError",
    "BrokenPipeError", "BufferError", "BytesWarning", "ChildProcessError", "ConnectionAbortedError",
    "ConnectionError", "ConnectionRefusedError", "ConnectionResetError", "DeprecationWarning",
    "EOFError", "Ellipsis", "EnvironmentError", "Exception", "False", "FileExistsError",
    "FileNotFoundError", "FloatingPointError", "FutureWarning", "GeneratorExit", "IOError",
    "ImportError", "ImportWarning", "IndentationError", "IndexError", "InterruptedError",
    "IsADirectoryError", "KeyError", "KeyboardInterrupt", "LookupError", "MemoryError",
    "ModuleNotFoundError", "NameError", "None", "NotADirectoryError", "NotImplemented",
    "NotImplementedError", "OSError", "OverflowError", "PendingDeprecationWarning",
    "PermissionError", "ProcessLookupError", "RecursionError", "ReferenceError", "ResourceWarning",
    "RuntimeError", "RuntimeWarning", "StopAsyncIteration", "StopIteration", "SyntaxError",
    "SyntaxWarning", "SystemError", "SystemExit", "TabError", "TimeoutError", "True", "TypeError",
    "UnboundLocalError", "UnicodeDecodeError", "UnicodeEncodeError", "UnicodeError",
    "UnicodeTranslateError", "UnicodeWarning", "UserWarning", "ValueError", "Warning",
    "ZeroDivisionError", "__build_class__", "__debug__", "__doc__", "__import__", "__name__",
    "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool", "breakpoint", "bytearray",
    "bytes", "callable", "chr", "classmethod", "compile", "complex", "copyright", "credits",
    "delattr", "dict", "dir", "divmod", "enumerate", "eval", "exec", "exit", "filter", "float",
    "format", "frozenset", "getattr", "globals", "hasattr", "hash", "help", "hex", "id", "input",
    "int", "isinstance", "issubclass", "iter", "len", "license", "list", "locals", "map", "max",
    "memoryview", "min", "next", "object", "oct", "open", "ord", "pow", "print", "property",
    "quit", "range", "repr", "reversed", "round", "set", "setattr", "slice", "sorted",
    "staticmethod", "str", "sum", "super", "tuple", "type", "vars", "zip",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.binary_search(&name).is_ok()
}

/// Settings that shape placeholder rendering, captured when a statement is
/// emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub use_name_mapper: bool,
    pub use_autocalling: bool,
    pub use_dotted_notation: bool,
    pub gettext_tokens: Vec<String>,
}

impl RenderOptions {
    pub fn from_settings(settings: &CompilerSettings) -> Self {
        Self {
            use_name_mapper: settings.use_name_mapper(),
            use_autocalling: settings.use_autocalling(),
            use_dotted_notation: settings.use_dotted_notation(),
            gettext_tokens: settings.gettext_tokens(),
        }
    }
}

/// Names statically known where an expression is emitted
pub trait NameScope {
    fn is_known(&self, name: &str) -> bool;
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Renders expressions for one emission point and collects the gettext
/// scannables found along the way
pub struct Renderer<'a> {
    options: &'a RenderOptions,
    scope: &'a dyn NameScope,
    scannables: Vec<String>,
}

impl<'a> Renderer<'a> {
    pub fn new(options: &'a RenderOptions, scope: &'a dyn NameScope) -> Self {
        Self {
            options,
            scope,
            scannables: Vec::new(),
        }
    }

    pub fn expression(&mut self, expr: &Expression) -> String {
        let mut out = String::new();
        for part in &expr.parts {
            match part {
                ExprPart::Text(text) => out.push_str(text),
                ExprPart::Var(var) => out.push_str(&self.var(var)),
            }
        }
        out
    }

    /// Suffixes are rendered before the reference itself, so scannables
    /// nested in call arguments come first.
    pub fn var(&mut self, var: &VarRef) -> String {
        let suffixes: Vec<String> = var
            .chunks
            .iter()
            .map(|chunk| self.expression(&chunk.suffix))
            .collect();

        let plain = var
            .chunks
            .iter()
            .zip(&suffixes)
            .map(|(chunk, suffix)| format!("{}{}", chunk.name, suffix))
            .collect::<Vec<_>>()
            .join(".");

        if var.names_any(&self.options.gettext_tokens) {
            self.scannables.push(format!(
                "{} # generated from line {}, col {}.",
                plain, var.line, var.column
            ));
        }

        if !self.options.use_name_mapper || var.comprehension_local || self.scope.is_known(var.head()) {
            return plain;
        }

        let dotted = py_bool(self.options.use_dotted_notation);
        let mut code = String::new();
        for (index, (chunk, suffix)) in var.chunks.iter().zip(&suffixes).enumerate() {
            let auto_call = py_bool(self.options.use_autocalling && chunk.auto_call);
            code = if index == 0 {
                format!("VFFSL(SL, \"{}\", {}, {}){}", chunk.name, auto_call, dotted, suffix)
            } else {
                format!("VFN({}, \"{}\", {}, {}){}", code, chunk.name, auto_call, dotted, suffix)
            };
        }
        code
    }

    pub fn into_scannables(self) -> Vec<String> {
        self.scannables
    }
}

// ============================================================================
// BINDING ANALYSIS
// ============================================================================

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "//=", "%=", "**=", ">>=", "<<=", "&=", "^=", "|=", "@=",
];

enum Piece<'e> {
    Token(String),
    Var(&'e VarRef),
}

impl Piece<'_> {
    fn is(&self, text: &str) -> bool {
        matches!(self, Piece::Token(token) if token == text)
    }

    fn depth_delta(&self) -> isize {
        match self {
            Piece::Token(token) if matches!(token.as_str(), "(" | "[" | "{") => 1,
            Piece::Token(token) if matches!(token.as_str(), ")" | "]" | "}") => -1,
            _ => 0,
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Piece::Token(token) if token.starts_with(is_ident_start) => Some(token),
            _ => None,
        }
    }
}

fn pieces(expr: &Expression) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    for part in &expr.parts {
        match part {
            ExprPart::Text(text) => out.extend(significant_tokens(text).into_iter().map(Piece::Token)),
            ExprPart::Var(var) => out.push(Piece::Var(var)),
        }
    }
    out
}

/// Split `pieces` at depth-0 tokens accepted by `is_separator`
fn split_top_level<'p, 'e>(pieces: &'p [Piece<'e>], is_separator: impl Fn(&Piece) -> bool) -> Vec<&'p [Piece<'e>]> {
    let mut segments = Vec::new();
    let mut depth = 0isize;
    let mut start = 0;
    for (index, piece) in pieces.iter().enumerate() {
        depth += piece.depth_delta();
        if depth == 0 && is_separator(piece) {
            segments.push(&pieces[start..index]);
            start = index + 1;
        }
    }
    segments.push(&pieces[start..]);
    segments
}

/// Plain names of a target list. Attribute, subscript and call heads are
/// not bindings, and neither is anything inside a subscript or call.
fn target_names(target: &[Piece]) -> Vec<String> {
    let mut names = Vec::new();
    let mut groups: Vec<bool> = Vec::new();
    for (index, piece) in target.iter().enumerate() {
        let previous = index.checked_sub(1).map(|i| &target[i]);
        match piece.depth_delta() {
            1 => {
                let is_access = previous.is_some_and(|p| {
                    p.name().is_some() || p.is(")") || p.is("]") || matches!(p, Piece::Var(_))
                });
                groups.push(is_access);
                continue;
            }
            -1 => {
                groups.pop();
                continue;
            }
            _ => {}
        }
        if groups.iter().any(|is_access| *is_access) {
            continue;
        }
        let Some(name) = piece.name() else {
            continue;
        };
        if matches!(name, "in" | "not" | "and" | "or" | "is" | "None" | "True" | "False") {
            continue;
        }
        let after_dot = previous.is_some_and(|p| p.is("."));
        let before_access = target
            .get(index + 1)
            .is_some_and(|next| next.is(".") || next.is("[") || next.is("("));
        if !after_dot && !before_access {
            names.push(name.to_string());
        }
    }
    names
}

/// Targets of `for TARGETS in ...`
pub fn for_targets(expr: &Expression) -> Vec<String> {
    let pieces = pieces(expr);
    let Some(start) = pieces.iter().position(|piece| piece.is("for")) else {
        return Vec::new();
    };
    let rest = &pieces[start + 1..];
    let target = split_top_level(rest, |piece| piece.is("in"))
        .into_iter()
        .next()
        .unwrap_or_default();
    target_names(target)
}

/// Names bound by `as` clauses of `with` and `except`
pub fn as_targets(expr: &Expression) -> Vec<String> {
    let pieces = pieces(expr);
    let mut names = Vec::new();
    for clause in split_top_level(&pieces, |piece| piece.is(",")) {
        if let Some(position) = clause.iter().position(|piece| piece.is("as")) {
            names.extend(target_names(&clause[position + 1..]));
        }
    }
    names
}

/// Keywords after which evaluation of the rest of an expression is optional
const CONDITIONAL_KEYWORDS: &[&str] = &["and", "or", "if", "else", "lambda", "for"];

/// Directive keywords an indenting expression starts with
const LEADING_KEYWORDS: &[&str] = &["if", "elif", "while", "for", "with"];

/// Names bound with `:=` where the assignment always runs. A boolean
/// operator, conditional expression, lambda or comprehension anywhere in
/// the expression makes every target conditional and none is returned.
pub fn walrus_targets(expr: &Expression) -> Vec<String> {
    let mut pieces = pieces(expr);
    if pieces
        .first()
        .is_some_and(|first| LEADING_KEYWORDS.iter().any(|keyword| first.is(keyword)))
    {
        pieces.remove(0);
    }
    if pieces
        .iter()
        .any(|piece| CONDITIONAL_KEYWORDS.iter().any(|keyword| piece.is(keyword)))
    {
        return Vec::new();
    }
    pieces
        .windows(2)
        .filter(|pair| pair[1].is(":="))
        .filter_map(|pair| pair[0].name().map(str::to_string))
        .collect()
}

/// Names bound by a raw Python statement. A placeholder in an assignment
/// target is reported through its offset.
pub fn statement_targets(expr: &Expression) -> Result<Vec<String>, usize> {
    let pieces = pieces(expr);
    let mut names = walrus_targets(expr);

    match pieces.first() {
        Some(first) if first.is("def") || first.is("class") => {
            names.extend(pieces.get(1).and_then(Piece::name).map(str::to_string));
            return Ok(names);
        }
        Some(first) if first.is("import") || first.is("from") => {
            names.extend(import_names(&expr.to_string()));
            return Ok(names);
        }
        _ => {}
    }

    let statement_end = pieces
        .iter()
        .position(|piece| piece.is("lambda"))
        .unwrap_or(pieces.len());
    let segments = split_top_level(&pieces[..statement_end], |piece| {
        ASSIGNMENT_OPERATORS.iter().any(|op| piece.is(op))
    });

    for target in &segments[..segments.len() - 1] {
        if let Some(Piece::Var(var)) = target.iter().find(|piece| matches!(piece, Piece::Var(_))) {
            return Err(var.offset);
        }
        let annotation = split_top_level(target, |piece| piece.is(":"));
        names.extend(target_names(annotation[0]));
    }
    Ok(names)
}

/// Names an `import` statement binds: the last word of every comma
/// separated item after `import`, stars excluded. An unaliased dotted
/// module binds its first component.
pub fn import_names(statement: &str) -> Vec<String> {
    let Some(index) = statement.find("import") else {
        return Vec::new();
    };
    statement[index + "import".len()..]
        .split(',')
        .filter_map(|item| {
            item.trim_matches(|c: char| c.is_whitespace() || c == '(' || c == ')')
                .split_whitespace()
                .last()
        })
        .filter(|name| *name != "*")
        .map(|name| name.split('.').next().unwrap_or(name).to_string())
        .collect()
}

/// Known names of a method: one set per open block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeStack {
    scopes: Vec<BTreeSet<String>>,
}

impl ScopeStack {
    pub fn new<I: IntoIterator<Item = String>>(base: I) -> Self {
        Self {
            scopes: vec![base.into_iter().collect()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(BTreeSet::new());
    }

    /// Drop the innermost block scope; the base scope always stays
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn bind(&mut self, name: impl Into<String>) {
        if self.scopes.is_empty() {
            self.scopes.push(BTreeSet::new());
        }
        if let Some(top) = self.scopes.last_mut() {
            top.insert(name.into());
        }
    }

    pub fn bind_base(&mut self, name: impl Into<String>) {
        if let Some(base) = self.scopes.first_mut() {
            base.insert(name.into());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    pub fn at_base(&self) -> bool {
        self.scopes.len() <= 1
    }
}
