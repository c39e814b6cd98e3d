//! Compilation drivers
//!
//! Entry points that wrap the parser with the ambient concerns: source
//! limits, logging, file reading and writing of the generated module.

mod error;
mod output;

pub use error::PipelineError;
pub use output::CompileOutput;

use crate::codegen::CodeGenerator;
use crate::config::compile_time::source::{MAX_LINE_COUNT, MAX_SOURCE_SIZE};
use crate::config::runtime::CompilerPreferences;
use crate::config::CompilerSettings;
use crate::logging::{self, codes};
use crate::syntax::Parser;
use crate::{log_error, log_info, log_success, log_warning};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Compile template text to Python module source
pub fn compile_source(source: &str, settings: &CompilerSettings) -> Result<String, PipelineError> {
    compile_source_with_preferences(source, settings, &CompilerPreferences::default())
}

pub fn compile_source_with_preferences(
    source: &str,
    settings: &CompilerSettings,
    preferences: &CompilerPreferences,
) -> Result<String, PipelineError> {
    Ok(generate(source, settings, preferences)?.module_code())
}

/// Names of the `#def` and `#block` methods a template defines, in
/// definition order
pub fn defined_method_names(source: &str, settings: &CompilerSettings) -> Result<Vec<String>, PipelineError> {
    let generator = generate(source, settings, &CompilerPreferences::default())?;
    let mut names = generator.method_names();
    // The main method is the only one still open after a successful parse
    names.pop();
    Ok(names)
}

/// Default settings with `key = value` overrides applied, one per line
pub fn settings_with_overrides(overrides: &str) -> Result<CompilerSettings, PipelineError> {
    let mut settings = CompilerSettings::default();
    settings.update_from_config_str(overrides)?;
    Ok(settings)
}

fn check_limits(source: &str) -> Result<(), PipelineError> {
    let size = source.len() as u64;
    if size > MAX_SOURCE_SIZE {
        return Err(PipelineError::SourceTooLarge {
            size,
            max: MAX_SOURCE_SIZE,
        });
    }
    let lines = source.lines().count();
    if lines > MAX_LINE_COUNT {
        return Err(PipelineError::TooManyLines {
            lines,
            max: MAX_LINE_COUNT,
        });
    }
    Ok(())
}

fn generate(
    source: &str,
    settings: &CompilerSettings,
    preferences: &CompilerPreferences,
) -> Result<CodeGenerator, PipelineError> {
    let start_time = Instant::now();

    if let Err(error) = check_limits(source) {
        log_error!(error.error_code(), "Template rejected", "reason" => error);
        return Err(error);
    }
    if source.is_empty() && preferences.warn_on_empty_source {
        log_warning!("You supplied an empty string for the source!");
    }

    match Parser::new(source, settings.clone())
        .with_preferences(preferences)
        .parse()
    {
        Ok(generator) => {
            log_success!(
                codes::success::TEMPLATE_COMPILED,
                "Template compiled",
                "methods" => generator.method_names().len(),
                "duration_ms" => format!("{:.2}", start_time.elapsed().as_secs_f64() * 1000.0)
            );
            Ok(generator)
        }
        Err(error) => {
            log_error!(
                error.error_code(),
                &format!("Template compilation failed: {}", error.message),
                position = error.position
            );
            Err(error.into())
        }
    }
}

// ============================================================================
// FILE COMPILATION
// ============================================================================

/// `dir/name.ext.tmpl` compiles to `dir/name.py`
pub fn output_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    path.with_file_name(format!("{}.py", stem))
}

/// Compile a template file and write the generated module to `target`, or
/// next to the source when no target is given
pub fn compile_file(
    path: &Path,
    target: Option<&Path>,
    settings: &CompilerSettings,
) -> Result<CompileOutput, PipelineError> {
    logging::with_file_context(path.to_path_buf(), || {
        log_info!("Compiling template", "file" => path.display());

        let output_path = target.map(Path::to_path_buf).unwrap_or_else(|| output_path_for(path));
        if output_path.as_path() == path {
            return Err(PipelineError::WouldOverwriteSource {
                path: path.display().to_string(),
            });
        }

        let bytes = fs::read(path)?;
        let source = String::from_utf8(bytes).map_err(|_| PipelineError::InvalidEncoding {
            path: path.display().to_string(),
        })?;

        let mut generator = generate(&source, settings, &CompilerPreferences::default())?;
        let method_names = generator.method_names();
        fs::write(&output_path, generator.module_code())?;

        log_success!(
            codes::success::MODULE_WRITTEN,
            "Module written",
            "output" => output_path.display()
        );

        Ok(CompileOutput::new(path.to_path_buf(), output_path, method_names))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_compile_source() {
        let code = compile_source("Hello $name", &CompilerSettings::default()).unwrap();
        assert!(code.starts_with("from Cheetah.DummyTransaction import DummyTransaction"));
        assert!(code.contains("class YelpCheetahTemplate(YelpCheetahBaseClass):"));
        assert!(code.contains("write('''Hello ''')"));
    }

    #[test]
    fn test_compile_source_logs_events() {
        let capture = logging::test_capture();
        compile_source("fine", &CompilerSettings::default()).unwrap();
        assert!(capture.has_success_with_code(codes::success::TEMPLATE_COMPILED));

        let error = compile_source("#end if\n", &CompilerSettings::default()).unwrap_err();
        assert_matches!(&error, PipelineError::Parse(parse) if parse.message == "#end found, but nothing to end");
        assert!(capture.has_error_with_code(codes::syntax::SYNTAX_ERROR));
    }

    #[test]
    fn test_source_too_large() {
        let source = "x".repeat(MAX_SOURCE_SIZE as usize + 1);
        assert_matches!(
            compile_source(&source, &CompilerSettings::default()),
            Err(PipelineError::SourceTooLarge { .. })
        );
    }

    #[test]
    fn test_empty_source_compiles() {
        let code = compile_source("", &CompilerSettings::default()).unwrap();
        assert!(code.contains("def respond(self, **KWS):"));
    }

    #[test]
    fn test_defined_method_names() {
        let names = defined_method_names(
            "#def foo()\n#end def\n#block bar\n#end block\n",
            &CompilerSettings::default(),
        )
        .unwrap();
        assert_eq!(names, vec!["foo".to_string(), "bar".to_string()]);
    }

    #[test]
    fn test_settings_with_overrides() {
        let settings = settings_with_overrides("useNameMapper = False").unwrap();
        assert!(!settings.use_name_mapper());
        assert_matches!(
            settings_with_overrides("noSuchSetting = 1"),
            Err(PipelineError::Settings(_))
        );
    }

    #[test]
    fn test_output_path_uses_first_dot() {
        assert_eq!(
            output_path_for(Path::new("/a/b/page.html.tmpl")),
            PathBuf::from("/a/b/page.py")
        );
        assert_eq!(output_path_for(Path::new("plain")), PathBuf::from("plain.py"));
    }

    #[test]
    fn test_compile_file_writes_module() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("page.tmpl");
        fs::write(&source, "#def title()\nHi\n#end def\n$title()\n").unwrap();

        let output = compile_file(&source, None, &CompilerSettings::default()).unwrap();
        assert_eq!(output.output_path, dir.path().join("page.py"));
        assert_eq!(output.method_names, vec!["title".to_string(), "respond".to_string()]);

        let written = fs::read_to_string(dir.path().join("page.py")).unwrap();
        assert!(written.contains("def title(self, **KWS):"));
        assert!(output.to_json().unwrap().contains("\"method_names\":[\"title\",\"respond\"]"));
    }

    #[test]
    fn test_compile_file_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.tmpl");
        let error = compile_file(&missing, None, &CompilerSettings::default()).unwrap_err();
        assert_eq!(error.error_code(), codes::file_processing::FILE_NOT_FOUND);

        let binary = dir.path().join("binary.tmpl");
        fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
        assert_matches!(
            compile_file(&binary, None, &CompilerSettings::default()),
            Err(PipelineError::InvalidEncoding { .. })
        );

        let python = dir.path().join("module.py");
        fs::write(&python, "x").unwrap();
        assert_matches!(
            compile_file(&python, None, &CompilerSettings::default()),
            Err(PipelineError::WouldOverwriteSource { .. })
        );
    }
}
