//! Python code generation
//!
//! The parser drives a [`CodeGenerator`] through a sequence of events (text,
//! placeholders, directive statements, method boundaries). The generator
//! keeps one [`ClassBuffer`] with an explicit stack of [`MethodBuffer`]s and
//! assembles the final module.
//!
//! ## Key Components
//!
//! - **[`literal`]** - Python string literal encoding of template text
//! - **[`names`]** - Placeholder rendering and binding analysis
//! - **[`MethodBuffer`]** - Lines, indentation and scopes of one method
//! - **[`ClassBuffer`]** - Method stack, decorators and attributes
//! - **[`CodeGenerator`]** - Module-level state and assembly

pub mod class;
pub mod literal;
pub mod method;
pub mod module;
pub mod names;

pub use class::ClassBuffer;
pub use method::MethodBuffer;
pub use module::CodeGenerator;

use crate::logging::{codes, Code};

/// One level of generated indentation
pub const INDENT: &str = "    ";

/// Name of the generated template class
pub const CLASS_NAME: &str = "YelpCheetahTemplate";

/// Alias the base class is imported under
pub const BASE_CLASS_NAME: &str = "YelpCheetahBaseClass";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    #[error("#return is not allowed in a method that also uses #yield")]
    ReturnInGenerator,

    #[error("#yield is not allowed in a method that also uses #return")]
    YieldAfterReturn,

    #[error("Attempted to dedent past the method's base indentation")]
    DedentBelowZero,

    #[error("No method is open")]
    NoActiveMethod,

    #[error("Maximum #def/#block nesting depth exceeded")]
    MethodDepthExceeded,

    #[error("Duplicate arguments: {}", .0.join(", "))]
    DuplicateArguments(Vec<String>),

    #[error("cannot assign to a placeholder")]
    AssignToPlaceholder { offset: usize },

    #[error("yelp_cheetah only supports extends by module name")]
    ExtendsImportedName,
}

impl CodegenError {
    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            CodegenError::AssignToPlaceholder { .. }
            | CodegenError::DuplicateArguments(_)
            | CodegenError::ExtendsImportedName => codes::syntax::SYNTAX_ERROR,
            CodegenError::NoActiveMethod => codes::system::INTERNAL_ERROR,
            _ => codes::codegen::INVALID_METHOD_STATE,
        }
    }

    /// Source offset the error belongs to, when it knows one better than
    /// the cursor
    pub fn offset(&self) -> Option<usize> {
        match self {
            CodegenError::AssignToPlaceholder { offset } => Some(*offset),
            _ => None,
        }
    }
}

pub type CodegenResult<T> = Result<T, CodegenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            CodegenError::DuplicateArguments(vec!["self".into(), "x".into()]).to_string(),
            "Duplicate arguments: self, x"
        );
        assert_eq!(
            CodegenError::AssignToPlaceholder { offset: 7 }.offset(),
            Some(7)
        );
        assert_eq!(CodegenError::ReturnInGenerator.offset(), None);
        assert_eq!(
            CodegenError::YieldAfterReturn.error_code(),
            codes::codegen::INVALID_METHOD_STATE
        );
    }
}
