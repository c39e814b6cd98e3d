//! Parse errors with template positions and rendered source excerpts
//!
//! Every user-facing failure ends up as a [`ParseError`] carrying the
//! message, the 1-based row and column and the report block printed by the
//! CLI. Failures raised where no position is at hand (cursor misuse, code
//! generation assertions) travel as a [`ParseFault`] and are located once,
//! at the cursor, by the top-level parse loop.

use crate::codegen::CodegenError;
use crate::lexical::reader::PositionError;
use crate::lexical::scanner::ScanError;
use crate::logging::{codes, Code};
use crate::utils::{Position, SourceMap};

pub type ParseResult<T> = Result<T, ParseFault>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    Syntax,
    UnknownDirective,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{report}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub position: Position,
    /// Offending closer of a mismatched enclosure
    pub closer: Option<Position>,
    pub report: String,
    code: Code,
}

impl ParseError {
    /// Build an error at `offset`. Offsets at or past the end of the source
    /// are reported at its last character.
    pub fn at(map: &SourceMap, offset: usize, kind: ParseErrorKind, message: &str) -> Self {
        let offset = if offset >= map.len() {
            map.len().saturating_sub(1)
        } else {
            offset
        };
        let position = map.position_at(offset);
        let code = match kind {
            ParseErrorKind::Syntax => codes::syntax::SYNTAX_ERROR,
            ParseErrorKind::UnknownDirective => codes::syntax::UNKNOWN_DIRECTIVE,
        };

        Self {
            kind,
            message: message.to_string(),
            position,
            closer: None,
            report: map.render_excerpt(position, message),
            code,
        }
    }

    pub fn syntax(map: &SourceMap, offset: usize, message: &str) -> Self {
        Self::at(map, offset, ParseErrorKind::Syntax, message)
    }

    pub fn unknown_directive(map: &SourceMap, offset: usize, name: &str) -> Self {
        let message = format!(
            "Bad directive name: \"{}\". You may want to escape that # sign?",
            name
        );
        Self::at(map, offset, ParseErrorKind::UnknownDirective, &message)
    }

    pub fn from_scan(map: &SourceMap, offset: usize, error: ScanError) -> Self {
        Self::syntax(map, offset, &error.to_string()).with_code(error.error_code())
    }

    pub fn with_closer(mut self, closer: Position) -> Self {
        self.closer = Some(closer);
        self
    }

    pub fn with_code(mut self, code: Code) -> Self {
        self.code = code;
        self
    }

    pub fn line(&self) -> u32 {
        self.position.line
    }

    pub fn column(&self) -> u32 {
        self.position.column
    }

    pub fn is_unknown_directive(&self) -> bool {
        self.kind == ParseErrorKind::UnknownDirective
    }

    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        self.code
    }
}

/// A failure that may still lack a position
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseFault {
    #[error(transparent)]
    Located(#[from] ParseError),

    #[error(transparent)]
    Position(#[from] PositionError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl ParseFault {
    /// Attach the cursor position to an unlocated fault, keeping its message
    pub fn locate(self, map: &SourceMap, offset: usize) -> ParseError {
        match self {
            ParseFault::Located(error) => error,
            ParseFault::Position(error) => {
                ParseError::syntax(map, offset, &error.to_string()).with_code(codes::system::INTERNAL_ERROR)
            }
            ParseFault::Codegen(error) => {
                let offset = error.offset().unwrap_or(offset);
                ParseError::syntax(map, offset, &error.to_string()).with_code(error.error_code())
            }
        }
    }

    pub fn is_unknown_directive(&self) -> bool {
        matches!(self, ParseFault::Located(error) if error.is_unknown_directive())
    }
}
