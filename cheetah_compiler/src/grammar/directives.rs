//! Directive vocabulary
//!
//! The set of directive names is closed. Each name has a fixed kind and a
//! default handler; a [`DirectiveHandlers`] strategy can route individual
//! directives elsewhere without touching the table itself.
use serde::{Deserialize, Serialize};

/// Every directive a template may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directive {
    // === SIMPLE EXPRESSION DIRECTIVES ===
    Pass,
    Continue,
    Break,
    Return,
    Yield,
    Del,
    Assert,
    Raise,
    Silent,
    Import,
    From,
    Py,

    // === CLASS AND METHOD LEVEL DIRECTIVES ===
    Super,
    Slurp,
    Attr,
    Extends,
    Implements,
    CompilerSettings,
    Decorator,

    // === INDENTING DIRECTIVES ===
    If,
    Else,
    Elif,
    For,
    While,
    Try,
    Except,
    Finally,
    With,
    Def,
    Block,

    // === CLOSER ===
    End,
}

/// Structural role of a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectiveKind {
    /// A single statement or a class-level declaration
    Expression,
    /// Opens a Python block
    Indenting,
    /// `#end NAME`
    End,
}

impl Directive {
    pub const ALL: [Directive; 31] = [
        Self::Pass,
        Self::Continue,
        Self::Break,
        Self::Return,
        Self::Yield,
        Self::Del,
        Self::Assert,
        Self::Raise,
        Self::Silent,
        Self::Import,
        Self::From,
        Self::Py,
        Self::Super,
        Self::Slurp,
        Self::Attr,
        Self::Extends,
        Self::Implements,
        Self::CompilerSettings,
        Self::Decorator,
        Self::If,
        Self::Else,
        Self::Elif,
        Self::For,
        Self::While,
        Self::Try,
        Self::Except,
        Self::Finally,
        Self::With,
        Self::Def,
        Self::Block,
        Self::End,
    ];

    /// Name as written after the directive start token
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Continue => "continue",
            Self::Break => "break",
            Self::Return => "return",
            Self::Yield => "yield",
            Self::Del => "del",
            Self::Assert => "assert",
            Self::Raise => "raise",
            Self::Silent => "silent",
            Self::Import => "import",
            Self::From => "from",
            Self::Py => "py",
            Self::Super => "super",
            Self::Slurp => "slurp",
            Self::Attr => "attr",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::CompilerSettings => "compiler-settings",
            Self::Decorator => "@",
            Self::If => "if",
            Self::Else => "else",
            Self::Elif => "elif",
            Self::For => "for",
            Self::While => "while",
            Self::Try => "try",
            Self::Except => "except",
            Self::Finally => "finally",
            Self::With => "with",
            Self::Def => "def",
            Self::Block => "block",
            Self::End => "end",
        }
    }

    /// Look up a raw directive name. Any `@name` is a decorator.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.starts_with('@') {
            return Some(Self::Decorator);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|directive| *directive != Self::Decorator && directive.as_str() == name)
    }

    pub const fn kind(self) -> DirectiveKind {
        match self {
            Self::If
            | Self::Else
            | Self::Elif
            | Self::For
            | Self::While
            | Self::Try
            | Self::Except
            | Self::Finally
            | Self::With
            | Self::Def
            | Self::Block => DirectiveKind::Indenting,
            Self::End => DirectiveKind::End,
            _ => DirectiveKind::Expression,
        }
    }

    /// Whether the block form must be closed with `#end NAME`
    pub const fn is_closeable(self) -> bool {
        matches!(
            self,
            Self::Def
                | Self::Block
                | Self::If
                | Self::For
                | Self::While
                | Self::Try
                | Self::With
                | Self::CompilerSettings
        )
    }

    /// Sibling clauses that continue the block opened before them
    pub const fn is_reindenting(self) -> bool {
        matches!(self, Self::Else | Self::Elif | Self::Except | Self::Finally)
    }

    /// Closeable directive named by `#end NAME`
    pub fn closeable_from_name(name: &str) -> Option<Self> {
        Self::from_name(name).filter(|directive| directive.is_closeable())
    }

    /// Handler used when no override applies
    pub const fn default_handler(self) -> Handler {
        match self {
            Self::Silent | Self::Py => Handler::Expression { include_name: false },
            Self::Pass
            | Self::Continue
            | Self::Break
            | Self::Return
            | Self::Yield
            | Self::Del
            | Self::Assert
            | Self::Raise
            | Self::Import
            | Self::From => Handler::Expression { include_name: true },
            Self::Super => Handler::Super,
            Self::Slurp => Handler::Slurp,
            Self::Attr => Handler::Attr,
            Self::Extends => Handler::Extends,
            Self::Implements => Handler::Implements,
            Self::CompilerSettings => Handler::CompilerSettings,
            Self::Decorator => Handler::Decorator,
            Self::If => Handler::If,
            Self::Else
            | Self::Elif
            | Self::For
            | Self::While
            | Self::Try
            | Self::Except
            | Self::Finally
            | Self::With => Handler::Indenting,
            Self::Def => Handler::Def,
            Self::Block => Handler::Block,
            Self::End => Handler::End,
        }
    }
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsing routine a directive is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// One statement; `include_name` keeps the directive name in the
    /// emitted text (`return x`) rather than dropping it (`#py x = 1`)
    Expression { include_name: bool },
    /// Block or single-line `for`, `while`, `with`, `try` and sibling clauses
    Indenting,
    If,
    End,
    Def,
    Block,
    Decorator,
    Attr,
    Extends,
    Implements,
    Super,
    Slurp,
    CompilerSettings,
}

/// Strategy mapping directives to handlers
///
/// The default mapping is total. Implementors override single entries by
/// returning `Some` from [`DirectiveHandlers::override_handler`].
pub trait DirectiveHandlers: Send + Sync {
    fn override_handler(&self, _directive: Directive) -> Option<Handler> {
        None
    }

    fn handler_for(&self, directive: Directive) -> Handler {
        self.override_handler(directive)
            .unwrap_or_else(|| directive.default_handler())
    }
}

/// The stock directive table
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardHandlers;

impl DirectiveHandlers for StandardHandlers {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for directive in Directive::ALL {
            let name = if directive == Directive::Decorator {
                "@cache"
            } else {
                directive.as_str()
            };
            assert_eq!(Directive::from_name(name), Some(directive));
        }
        assert_eq!(Directive::from_name("set"), None);
        assert_eq!(Directive::from_name("call"), None);
        assert_eq!(Directive::from_name("filter"), None);
    }

    #[test]
    fn test_kinds_and_closeable() {
        assert_eq!(Directive::Block.kind(), DirectiveKind::Indenting);
        assert_eq!(Directive::Attr.kind(), DirectiveKind::Expression);
        assert_eq!(Directive::End.kind(), DirectiveKind::End);
        assert!(Directive::CompilerSettings.is_closeable());
        assert!(!Directive::Else.is_closeable());
        assert_eq!(Directive::closeable_from_name("while"), Some(Directive::While));
        assert_eq!(Directive::closeable_from_name("elif"), None);
    }

    #[test]
    fn test_default_handlers() {
        let handlers = StandardHandlers;
        assert_eq!(
            handlers.handler_for(Directive::Py),
            Handler::Expression { include_name: false }
        );
        assert_eq!(
            handlers.handler_for(Directive::Return),
            Handler::Expression { include_name: true }
        );
        assert_eq!(handlers.handler_for(Directive::Elif), Handler::Indenting);
    }

    #[test]
    fn test_override_hook() {
        struct SilentPass;
        impl DirectiveHandlers for SilentPass {
            fn override_handler(&self, directive: Directive) -> Option<Handler> {
                (directive == Directive::Pass).then_some(Handler::Slurp)
            }
        }

        assert_eq!(SilentPass.handler_for(Directive::Pass), Handler::Slurp);
        assert_eq!(SilentPass.handler_for(Directive::If), Handler::If);
    }
}
