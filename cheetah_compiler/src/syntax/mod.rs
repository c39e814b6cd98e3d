//! Syntax analysis module - template text to generated Python
//!
//! The parser reads the template in one pass and feeds the code generator
//! as it goes. There is no intermediate tree: a directive is emitted as soon
//! as its tag has been read, and the first error ends the pass with a
//! located [`ParseError`].

pub mod error;
mod parser;

pub use error::{ParseError, ParseErrorKind, ParseFault, ParseResult};
pub use parser::Parser;

use crate::codegen::CodeGenerator;
use crate::config::CompilerSettings;
use crate::log_debug;

/// Parse a template with global logging
pub fn parse_template(source: &str, settings: CompilerSettings) -> Result<CodeGenerator, ParseError> {
    log_debug!("Starting template parse", "chars" => source.chars().count());

    let result = Parser::new(source, settings).parse();

    if let Err(error) = &result {
        log_debug!("Template parse failed",
            "line" => error.line(),
            "column" => error.column(),
            "message" => error.message.as_str()
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template_method_names() {
        let generator = parse_template(
            "#block header\nhi\n#end block\n#def footer()\n#end def\n",
            CompilerSettings::default(),
        )
        .unwrap();
        assert_eq!(
            generator.method_names(),
            vec!["header".to_string(), "footer".to_string(), "respond".to_string()]
        );
    }

    #[test]
    fn test_parse_template_error_is_located() {
        let error = parse_template("hi\n#end if\n", CompilerSettings::default()).unwrap_err();
        assert_eq!(error.message, "#end found, but nothing to end");
        assert_eq!(error.line(), 2);
    }
}
