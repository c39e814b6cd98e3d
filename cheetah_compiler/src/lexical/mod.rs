//! Lexical layer of the template compiler
//!
//! Provides the position-tracked cursor, the start-token matchers, the
//! maximal-munch tokenizer for embedded Python and the recursive scanners
//! that read placeholders, argument lists and expressions.
//!
//! ## Key Components
//!
//! - **[`SourceReader`]** - Cursor and break point over the template text
//! - **[`TokenMatchers`]** - Comment, placeholder and directive start tokens
//! - **[`scanner`]** - One-token-at-a-time Python tokenizer
//! - **[`Lexer`]** - Placeholder and expression scanning on top of the cursor
//! - **[`comprehension`]** - Comprehension-local placeholder detection

pub mod comprehension;
pub mod expression;
pub mod matchers;
pub mod reader;
pub mod scanner;

pub use expression::{ExpressionOptions, Lexer, Placeholder};
pub use matchers::{directive_name_at, TokenMatchers};
pub use reader::{PositionError, SourceReader};
pub use scanner::{PyToken, PyTokenKind, ScanError};
