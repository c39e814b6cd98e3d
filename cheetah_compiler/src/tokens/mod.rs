//! Expression parts produced by the lexer
//!
//! An embedded expression is kept as an ordered list of parts: opaque Python
//! text and `$placeholder` references. The code generator decides how each
//! reference is rendered (resolver call or bare name) at the point where the
//! expression is emitted, because that depends on the names known there.
//!
//! ## Key Components
//!
//! - **[`ExprPart`]** - Either literal text or a placeholder reference
//! - **[`VarRef`]** - A placeholder broken into resolvable chunks
//! - **[`NameChunk`]** - One dotted name plus its call/subscript suffix
//! - **[`Expression`]** - An ordered part list with trimming helpers
//! - **[`Argument`]** - One parameter of a `#def` or `#super` argument list

use std::fmt;

/// One dotted-name link of a placeholder
///
/// `$a.b.c[1].d()` is split into `("a.b", auto_call)`, `("c", "[1]")` and
/// `("d", "()")`. A chunk with a call suffix is never auto-called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameChunk {
    pub name: String,
    pub auto_call: bool,
    pub suffix: Expression,
}

impl NameChunk {
    pub fn new(name: impl Into<String>, auto_call: bool, suffix: Expression) -> Self {
        Self {
            name: name.into(),
            auto_call,
            suffix,
        }
    }

    /// First identifier of the dotted name
    pub fn head(&self) -> &str {
        self.name.split('.').next().unwrap_or_default()
    }
}

/// A `$placeholder` reference inside an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub chunks: Vec<NameChunk>,
    /// Source offset the reference was read at
    pub offset: usize,
    pub line: u32,
    pub column: u32,
    /// Set when the head name is bound by an enclosing comprehension
    pub comprehension_local: bool,
}

impl VarRef {
    pub fn new(chunks: Vec<NameChunk>, offset: usize, line: u32, column: u32) -> Self {
        Self {
            chunks,
            offset,
            line,
            column,
            comprehension_local: false,
        }
    }

    /// Identifier the reference starts with
    pub fn head(&self) -> &str {
        self.chunks.first().map(NameChunk::head).unwrap_or_default()
    }

    /// Whether any chunk names one of `tokens`
    pub fn names_any(&self, tokens: &[String]) -> bool {
        self.chunks
            .iter()
            .any(|chunk| tokens.iter().any(|token| token == &chunk.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprPart {
    Text(String),
    Var(VarRef),
}

/// Ordered list of expression parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expression {
    pub parts: Vec<ExprPart>,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let mut expr = Self::new();
        expr.push_text(text);
        expr
    }

    /// Append text, merging with a trailing text part
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.parts.last_mut() {
            Some(ExprPart::Text(existing)) => existing.push_str(&text),
            _ => self.parts.push(ExprPart::Text(text)),
        }
    }

    pub fn push_var(&mut self, var: VarRef) {
        self.parts.push(ExprPart::Var(var));
    }

    pub fn extend(&mut self, other: Expression) {
        for part in other.parts {
            match part {
                ExprPart::Text(text) => self.push_text(text),
                ExprPart::Var(var) => self.push_var(var),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn has_vars(&self) -> bool {
        self.parts.iter().any(|part| matches!(part, ExprPart::Var(_)))
    }

    pub fn vars(&self) -> impl Iterator<Item = &VarRef> {
        self.parts.iter().filter_map(|part| match part {
            ExprPart::Var(var) => Some(var),
            ExprPart::Text(_) => None,
        })
    }

    /// Text of an expression known to contain no placeholders
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Strip surrounding whitespace from the outer text parts
    pub fn trimmed(mut self) -> Self {
        if let Some(ExprPart::Text(first)) = self.parts.first_mut() {
            *first = first.trim_start().to_string();
        }
        if let Some(ExprPart::Text(last)) = self.parts.last_mut() {
            *last = last.trim_end().to_string();
        }
        self.parts
            .retain(|part| !matches!(part, ExprPart::Text(text) if text.is_empty()));
        self
    }

    /// Drop a trailing closing character (the closer of a long-form
    /// placeholder)
    pub fn strip_suffix_char(&mut self, closer: char) -> bool {
        if let Some(ExprPart::Text(last)) = self.parts.last_mut() {
            if last.ends_with(closer) {
                last.pop();
                if last.is_empty() {
                    self.parts.pop();
                }
                return true;
            }
        }
        false
    }

    /// Last character of the expression when it ends in text
    pub fn last_char(&self) -> Option<char> {
        match self.parts.last() {
            Some(ExprPart::Text(text)) => text.chars().last(),
            _ => None,
        }
    }
}

/// A declared parameter with its default value text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub default: Option<String>,
}

impl Argument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    /// Name without its `*` or `**` prefix
    pub fn bare_name(&self) -> &str {
        self.name.trim_start_matches('*')
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "{}={}", self.name, default),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Renders placeholders in their source spelling; used for diagnostics and
/// for scanning placeholder-free text.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                ExprPart::Text(text) => write!(f, "{}", text)?,
                ExprPart::Var(var) => write!(f, "{}", var)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for (idx, chunk) in self.chunks.iter().enumerate() {
            if idx > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}{}", chunk.name, chunk.suffix)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> VarRef {
        VarRef::new(vec![NameChunk::new(name, true, Expression::new())], 0, 1, 1)
    }

    #[test]
    fn test_push_text_merges_adjacent_text() {
        let mut expr = Expression::from_text("foo");
        expr.push_text("(");
        expr.push_var(var("bar"));
        expr.push_text(")");
        assert_eq!(expr.parts.len(), 3);
        assert_eq!(expr.to_string(), "foo($bar)");
        assert!(expr.has_vars());
    }

    #[test]
    fn test_trimmed_strips_outer_text() {
        let mut expr = Expression::from_text("  if ");
        expr.push_var(var("x"));
        expr.push_text("  ");
        let trimmed = expr.trimmed();
        assert_eq!(trimmed.to_string(), "if $x");
        assert_eq!(trimmed.parts.len(), 2);
    }

    #[test]
    fn test_strip_suffix_char() {
        let mut expr = Expression::from_text("a + b}");
        assert!(expr.strip_suffix_char('}'));
        assert_eq!(expr.text(), "a + b");
        assert!(!expr.strip_suffix_char('}'));
    }

    #[test]
    fn test_argument_display() {
        assert_eq!(Argument::with_default("x", "1").to_string(), "x=1");
        let kwargs = Argument::new("**kwargs");
        assert_eq!(kwargs.to_string(), "**kwargs");
        assert_eq!(kwargs.bare_name(), "kwargs");
    }

    #[test]
    fn test_var_display_and_head() {
        let chunks = vec![
            NameChunk::new("a.b", true, Expression::new()),
            NameChunk::new("c", false, Expression::from_text("()")),
        ];
        let var = VarRef::new(chunks, 0, 1, 1);
        assert_eq!(var.head(), "a");
        assert_eq!(var.to_string(), "$a.b.c()");
        assert!(var.names_any(&["c".to_string()]));
        assert!(!var.names_any(&["a".to_string()]));
    }
}
