//! Module-level code generation
//!
//! [`CodeGenerator`] is the single sink the parser talks to. It owns the
//! compiler settings, the template class, the import list and the gettext
//! scannables, and renders every expression at the point it is emitted so
//! that the names known there decide how placeholders resolve.

use std::collections::BTreeSet;

use super::class::ClassBuffer;
use super::method::MethodBuffer;
use super::names::{self, NameScope, RenderOptions, Renderer};
use super::{CodegenError, CodegenResult, BASE_CLASS_NAME, CLASS_NAME, INDENT};
use crate::config::{CompilerSettings, SettingsError};
use crate::grammar::Directive;
use crate::lexical::Placeholder;
use crate::tokens::{Argument, Expression};

const PROLOGUE: [&str; 4] = [
    "from Cheetah.DummyTransaction import DummyTransaction",
    "from Cheetah.NameMapper import valueForName as VFN",
    "from Cheetah.NameMapper import valueFromFrameOrSearchList as VFFSL",
    "from Cheetah.Template import NO_CONTENT",
];

const PROLOGUE_NAMES: [&str; 4] = ["DummyTransaction", "VFN", "VFFSL", "NO_CONTENT"];

/// Names known in the method currently being generated
struct MethodScope<'a> {
    method: &'a MethodBuffer,
    imported: &'a BTreeSet<String>,
}

impl NameScope for MethodScope<'_> {
    fn is_known(&self, name: &str) -> bool {
        self.method.is_local(name) || self.imported.contains(name) || names::is_builtin(name)
    }
}

#[derive(Debug, Clone)]
pub struct CodeGenerator {
    settings: CompilerSettings,
    class: ClassBuffer,
    imports: Vec<String>,
    base_class_import: String,
    imported_names: BTreeSet<String>,
    scannables: Vec<String>,
}

impl CodeGenerator {
    pub fn new(settings: CompilerSettings) -> Self {
        let class = ClassBuffer::new(&settings.main_method_name());
        Self {
            settings,
            class,
            imports: Vec::new(),
            base_class_import: format!("from Cheetah.Template import Template as {}", BASE_CLASS_NAME),
            imported_names: PROLOGUE_NAMES.iter().map(|name| name.to_string()).collect(),
            scannables: Vec::new(),
        }
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    pub fn update_settings_from_str(&mut self, text: &str) -> Result<(), SettingsError> {
        self.settings.update_from_config_str(text)
    }

    pub fn class(&self) -> &ClassBuffer {
        &self.class
    }

    fn method(&mut self) -> CodegenResult<&mut MethodBuffer> {
        self.class.current_mut()
    }

    /// Render `expr` for the current method, collecting gettext scannables
    pub fn render(&mut self, expr: &Expression) -> CodegenResult<String> {
        let options = RenderOptions::from_settings(&self.settings);
        let method = self.class.current()?;
        let scope = MethodScope {
            method,
            imported: &self.imported_names,
        };
        let mut renderer = Renderer::new(&options, &scope);
        let code = renderer.expression(expr);
        self.scannables.extend(renderer.into_scannables());
        Ok(code)
    }

    // ============================================================================
    // TEXT AND PLACEHOLDERS
    // ============================================================================

    pub fn add_str_const(&mut self, text: &str) -> CodegenResult<()> {
        self.method()?.add_str_const(text);
        Ok(())
    }

    pub fn commit_str_const(&mut self) -> CodegenResult<()> {
        self.method()?.commit_str_const();
        Ok(())
    }

    pub fn handle_ws_before_directive(&mut self) -> CodegenResult<()> {
        self.method()?.handle_ws_before_directive();
        Ok(())
    }

    /// A template comment, one `#` line per source line
    pub fn add_comment(&mut self, comment: &str) -> CodegenResult<()> {
        let method = self.method()?;
        for line in comment.lines() {
            method.add_method_comment(line);
        }
        Ok(())
    }

    pub fn add_placeholder(&mut self, placeholder: &Placeholder) -> CodegenResult<()> {
        let code = self.render(&placeholder.expr)?;
        self.method()?
            .add_placeholder(&code, &placeholder.raw, placeholder.line, placeholder.column);
        Ok(())
    }

    // ============================================================================
    // STATEMENTS
    // ============================================================================

    /// `#pass`, `#return x`, `#silent x`, `#assert ...` and friends
    pub fn add_statement(&mut self, directive: Directive, expr: &Expression) -> CodegenResult<()> {
        let code = self.render(expr)?;
        let method = self.method()?;
        match directive {
            Directive::Return => method.add_return(&code),
            Directive::Yield => method.add_yield(&code),
            Directive::Silent => {
                method.add_chunk(&code);
                self.bind_walrus(expr)
            }
            _ => {
                method.add_chunk(&code);
                Ok(())
            }
        }
    }

    /// `#py STATEMENT`: emitted verbatim, its targets become locals
    pub fn add_py(&mut self, expr: &Expression) -> CodegenResult<()> {
        let targets = names::statement_targets(expr).map_err(|offset| CodegenError::AssignToPlaceholder { offset })?;
        let code = self.render(expr)?;
        let method = self.method()?;
        method.add_chunk(&code);
        for target in targets {
            method.bind(target);
        }
        Ok(())
    }

    /// `#import` / `#from`. Hoisted to the module in legacy import mode,
    /// emitted in place otherwise.
    pub fn add_import(&mut self, statement: &str) -> CodegenResult<()> {
        let bound = names::import_names(statement);
        if self.settings.use_legacy_import_mode() {
            self.imports.push(statement.to_string());
            self.imported_names.extend(bound);
        } else {
            let method = self.method()?;
            method.add_chunk(statement);
            if method.at_base_scope() {
                for name in bound {
                    method.bind_base(name);
                }
            }
        }
        Ok(())
    }

    fn bind_walrus(&mut self, expr: &Expression) -> CodegenResult<()> {
        let targets = names::walrus_targets(expr);
        let method = self.method()?;
        for target in targets {
            method.bind(target);
        }
        Ok(())
    }

    fn bind_block_targets(&mut self, directive: Directive, expr: &Expression) -> CodegenResult<()> {
        let targets = match directive {
            Directive::For => names::for_targets(expr),
            Directive::With | Directive::Except => names::as_targets(expr),
            _ => Vec::new(),
        };
        let method = self.method()?;
        for target in targets {
            method.bind(target);
        }
        Ok(())
    }

    /// `#if`, `#for`, `#while`, `#try`, `#with`: the expression is rendered
    /// before the names it binds become visible
    pub fn add_indenting(&mut self, directive: Directive, expr: &Expression, line: u32, column: u32) -> CodegenResult<()> {
        let code = self.render(expr)?;
        self.bind_walrus(expr)?;
        self.method()?.add_indenting_directive(&code, line, column);
        self.bind_block_targets(directive, expr)
    }

    /// `#else`, `#elif`, `#except`, `#finally`
    pub fn add_reindenting(
        &mut self,
        directive: Directive,
        expr: &Expression,
        line: u32,
        column: u32,
        dedent: bool,
    ) -> CodegenResult<()> {
        let mut code = self.render(expr)?;
        if matches!(directive, Directive::Else | Directive::Elif) {
            code = else_if_to_elif(&code);
        }
        self.method()?
            .add_reindenting_directive(&code, line, column, dedent)?;
        self.bind_walrus(expr)?;
        self.bind_block_targets(directive, expr)
    }

    /// End of a control block
    pub fn close_block_statement(&mut self) -> CodegenResult<()> {
        let method = self.method()?;
        method.commit_str_const();
        method.dedent()
    }

    // ============================================================================
    // METHODS AND CLASS MEMBERS
    // ============================================================================

    pub fn start_method(&mut self, name: &str, args: Vec<Argument>, comment: &str) -> CodegenResult<()> {
        self.class.push_method(name, args, comment)
    }

    pub fn close_def(&mut self) -> CodegenResult<()> {
        self.class.close_def()
    }

    pub fn close_block(&mut self) -> CodegenResult<()> {
        self.class.close_block()
    }

    pub fn add_decorator(&mut self, decorator: &str) {
        self.class.add_decorator(decorator);
    }

    pub fn add_attribute(&mut self, name: &str, expr: &str) {
        self.class.add_attribute(&format!("{} = {}", name, expr));
    }

    /// `#super(args)`: call the same method on the base class
    pub fn add_super(&mut self, args: &[Argument]) -> CodegenResult<()> {
        let method = self.method()?;
        let args: Vec<String> = args.iter().map(Argument::to_string).collect();
        let call = format!(
            "super({}, self).{}({})",
            CLASS_NAME,
            method.name(),
            args.join(", ")
        );
        method.add_filtered_chunk(&call, None);
        Ok(())
    }

    pub fn set_main_method_name(&mut self, name: &str) {
        self.class.set_main_method_name(name);
    }

    /// `#extends a.b`: import the base class under the alias and move the
    /// main body to the subclass entry point
    pub fn set_base_class(&mut self, name: &str) -> CodegenResult<()> {
        let subclass_main = self.settings.main_method_name_for_subclasses();
        self.set_main_method_name(&subclass_main);

        if self.imported_names.contains(name) {
            return Err(CodegenError::ExtendsImportedName);
        }

        let mut chunks: Vec<&str> = name.split('.').collect();
        if chunks.len() == 1 {
            chunks.push(chunks[0]);
        }
        let class_name = chunks[chunks.len() - 1];
        let module = if class_name != chunks[chunks.len() - 2] {
            chunks.join(".")
        } else {
            chunks[..chunks.len() - 1].join(".")
        };
        self.base_class_import = format!("from {} import {} as {}", module, class_name, BASE_CLASS_NAME);
        Ok(())
    }

    pub fn method_names(&self) -> Vec<String> {
        self.class.method_names()
    }

    // ============================================================================
    // MODULE ASSEMBLY
    // ============================================================================

    fn import_block(&self) -> String {
        PROLOGUE
            .iter()
            .map(|line| line.to_string())
            .chain(self.imports.iter().cloned())
            .chain(std::iter::once(self.base_class_import.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn scannable_block(&self) -> String {
        if self.scannables.is_empty() {
            return String::new();
        }
        let mut lines = vec![
            "\n".to_string(),
            "## CHEETAH GENERATED SCANNABLE GETTEXT".to_string(),
            "\ndef __CHEETAH_scannables():".to_string(),
        ];
        lines.extend(self.scannables.iter().map(|scannable| format!("{}{}", INDENT, scannable)));
        lines.join("\n")
    }

    fn footer() -> String {
        format!(
            "\n# CHEETAH was developed by Tavis Rudd and Mike Orr\n\
             # with code, advice and input from many other volunteers.\n\
             # For more information visit http://www.CheetahTemplate.org/\n\
             \n\
             if __name__ == '__main__':\n    \
             from os import environ\n    \
             from sys import stdout\n    \
             stdout.write({}(searchList=[environ]).respond())\n",
            CLASS_NAME
        )
    }

    /// Finish every open method and assemble the module source
    pub fn module_code(&mut self) -> String {
        let classes = self.class.class_def();
        let module = format!(
            "{}\n\n# This is compiled yelp_cheetah sourcecode\n__YELP_CHEETAH__ = True\n\n{}\n\n{}\n\n{}",
            self.import_block(),
            classes,
            self.scannable_block(),
            Self::footer()
        );
        module.trim().to_string()
    }
}

/// `else if` (any spacing) is spelled `elif` in Python
fn else_if_to_elif(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    while let Some(index) = rest.find("else") {
        out.push_str(&rest[..index]);
        let after = &rest[index + 4..];
        let gap = after.len() - after.trim_start_matches([' ', '\u{c}', '\t']).len();
        if gap > 0 && after[gap..].starts_with("if") {
            out.push_str("elif");
            rest = &after[gap + 2..];
        } else {
            out.push_str("else");
            rest = after;
        }
    }
    out.push_str(rest);
    out
}
