//! Template grammar definitions

pub mod directives;

pub use directives::{Directive, DirectiveHandlers, DirectiveKind, Handler, StandardHandlers};
