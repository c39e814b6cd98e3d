//! The generated template class
//!
//! Methods nest while they are being generated (`#def` inside `#block` and
//! so on), so the class keeps an explicit stack of active methods. The main
//! method sits at the bottom of the stack until the class is finished.

use super::method::MethodBuffer;
use super::{CodegenError, CodegenResult, BASE_CLASS_NAME, CLASS_NAME, INDENT};
use crate::config::compile_time::syntax::MAX_METHOD_DEPTH;
use crate::tokens::Argument;

pub const MAIN_METHOD_COMMENT: &str = "## CHEETAH: main method generated for this template";

#[derive(Debug, Clone)]
pub struct ClassBuffer {
    active: Vec<MethodBuffer>,
    finished: Vec<MethodBuffer>,
    pending_decorators: Vec<String>,
    attributes: Vec<String>,
}

impl ClassBuffer {
    pub fn new(main_method_name: &str) -> Self {
        Self {
            active: vec![MethodBuffer::new(main_method_name, Vec::new(), Vec::new(), MAIN_METHOD_COMMENT)],
            finished: Vec::new(),
            pending_decorators: Vec::new(),
            attributes: Vec::new(),
        }
    }

    // ============================================================================
    // METHOD STACK
    // ============================================================================

    pub fn current(&self) -> CodegenResult<&MethodBuffer> {
        self.active.last().ok_or(CodegenError::NoActiveMethod)
    }

    pub fn current_mut(&mut self) -> CodegenResult<&mut MethodBuffer> {
        self.active.last_mut().ok_or(CodegenError::NoActiveMethod)
    }

    /// Number of methods being generated, the main method included
    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Open a `#def` or `#block` method. Pending decorators attach to it.
    pub fn push_method(&mut self, name: &str, args: Vec<Argument>, comment: &str) -> CodegenResult<()> {
        if self.active.len() > MAX_METHOD_DEPTH {
            return Err(CodegenError::MethodDepthExceeded);
        }
        let mut seen: Vec<&str> = vec!["self"];
        let mut duplicates: Vec<String> = Vec::new();
        for arg in &args {
            let name = arg.bare_name();
            if seen.contains(&name) {
                if !duplicates.iter().any(|dup| dup == name) {
                    duplicates.push(name.to_string());
                }
            } else {
                seen.push(name);
            }
        }
        if !duplicates.is_empty() {
            return Err(CodegenError::DuplicateArguments(duplicates));
        }

        let decorators = std::mem::take(&mut self.pending_decorators);
        self.active.push(MethodBuffer::new(name, args, decorators, comment));
        Ok(())
    }

    pub fn pop_method(&mut self) -> CodegenResult<MethodBuffer> {
        self.active.pop().ok_or(CodegenError::NoActiveMethod)
    }

    fn finish_method(&mut self, mut method: MethodBuffer) {
        method.finish();
        self.finished.push(method);
    }

    /// `#end def`
    pub fn close_def(&mut self) -> CodegenResult<()> {
        self.current_mut()?.commit_str_const();
        let method = self.pop_method()?;
        self.finish_method(method);
        Ok(())
    }

    /// `#end block`: the block is also called where it was defined
    pub fn close_block(&mut self) -> CodegenResult<()> {
        self.current_mut()?.commit_str_const();
        let method = self.pop_method()?;
        let call = format!("self.{}()", method.name());
        self.finish_method(method);
        self.current_mut()?.add_chunk(&call);
        Ok(())
    }

    pub fn set_main_method_name(&mut self, name: &str) {
        if let Some(main) = self.active.first_mut() {
            main.set_name(name);
        }
    }

    /// Names of all methods generated so far, in definition order, followed
    /// by the ones still open
    pub fn method_names(&self) -> Vec<String> {
        self.finished
            .iter()
            .chain(self.active.iter())
            .map(|method| method.name().to_string())
            .collect()
    }

    // ============================================================================
    // CLASS MEMBERS
    // ============================================================================

    pub fn add_decorator(&mut self, decorator: &str) {
        self.pending_decorators.push(decorator.to_string());
    }

    pub fn add_attribute(&mut self, attribute: &str) {
        self.attributes.push(attribute.to_string());
    }

    /// Finish every method still open, innermost first
    pub fn finish(&mut self) {
        while let Some(method) = self.active.pop() {
            self.finish_method(method);
        }
    }

    pub fn class_def(&mut self) -> String {
        self.finish();
        let methods: Vec<String> = self
            .finished
            .iter_mut()
            .map(MethodBuffer::method_def)
            .collect();
        let attributes: Vec<String> = self
            .attributes
            .iter()
            .map(|attribute| format!("{}{}", INDENT, attribute))
            .collect();

        [
            format!("class {}({}):", CLASS_NAME, BASE_CLASS_NAME),
            format!("{}## CHEETAH GENERATED METHODS", INDENT),
            "\n".to_string(),
            methods.join("\n\n"),
            format!("{}## CHEETAH GENERATED ATTRIBUTES", INDENT),
            "\n".to_string(),
            attributes.join("\n\n"),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_block_is_called_from_parent() {
        let mut class = ClassBuffer::new("respond");
        class.push_method("header", Vec::new(), "## block").unwrap();
        class.current_mut().unwrap().add_str_const("hi");
        class.close_block().unwrap();
        assert_eq!(class.depth(), 1);

        let code = class.class_def();
        assert!(code.contains("def header(self, **KWS):"));
        assert!(code.contains("\n        self.header()"));
        let header = code.find("def header").unwrap();
        let respond = code.find("def respond").unwrap();
        assert!(header < respond);
    }

    #[test]
    fn test_duplicate_arguments() {
        let mut class = ClassBuffer::new("respond");
        assert_matches!(
            class.push_method("f", vec![Argument::new("self")], ""),
            Err(CodegenError::DuplicateArguments(names)) if names == vec!["self".to_string()]
        );
        assert_matches!(
            class.push_method("f", vec![Argument::new("a"), Argument::new("*a")], ""),
            Err(CodegenError::DuplicateArguments(_))
        );
    }

    #[test]
    fn test_decorators_attach_to_next_method() {
        let mut class = ClassBuffer::new("respond");
        class.add_decorator("@a");
        class.add_decorator("@b");
        class.push_method("f", Vec::new(), "").unwrap();
        class.close_def().unwrap();
        class.push_method("g", Vec::new(), "").unwrap();
        class.close_def().unwrap();
        let code = class.class_def();
        assert!(code.contains("    @a\n    @b\n    def f(self, **KWS):"));
        assert!(code.contains("\n\n    def g(self, **KWS):"));
    }

    #[test]
    fn test_attributes_and_rename() {
        let mut class = ClassBuffer::new("respond");
        class.add_attribute("x = 1");
        class.set_main_method_name("writeBody");
        assert_eq!(class.method_names(), vec!["writeBody".to_string()]);
        let code = class.class_def();
        assert!(code.starts_with("class YelpCheetahTemplate(YelpCheetahBaseClass):\n    ## CHEETAH GENERATED METHODS\n\n\n"));
        assert!(code.ends_with("    ## CHEETAH GENERATED ATTRIBUTES\n\n\n    x = 1"));
    }

    #[test]
    fn test_method_depth_limit() {
        let mut class = ClassBuffer::new("respond");
        let mut result = Ok(());
        for index in 0..=MAX_METHOD_DEPTH + 1 {
            result = class.push_method(&format!("m{}", index), Vec::new(), "");
            if result.is_err() {
                break;
            }
        }
        assert_matches!(result, Err(CodegenError::MethodDepthExceeded));
    }
}
