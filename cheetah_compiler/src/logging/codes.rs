//! Consolidated error codes and classification system
//!
//! Single source of truth for the compiler's error and success codes and
//! the metadata attached to each one.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for an error code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
}

/// Template file access error codes
pub mod file_processing {
    use super::Code;

    pub const FILE_NOT_FOUND: Code = Code::new("E005");
    pub const SOURCE_TOO_LARGE: Code = Code::new("E007");
    pub const INVALID_ENCODING: Code = Code::new("E010");
    pub const IO_ERROR: Code = Code::new("E011");
}

/// Embedded-expression scanning error codes
pub mod lexical {
    use super::Code;

    pub const INVALID_SYNTAX: Code = Code::new("E020");
    pub const MALFORMED_STRING: Code = Code::new("E021");
}

/// Template parse error codes
pub mod syntax {
    use super::Code;

    pub const SYNTAX_ERROR: Code = Code::new("E040");
    pub const UNKNOWN_DIRECTIVE: Code = Code::new("E041");
}

/// Code generation error codes
pub mod codegen {
    use super::Code;

    pub const INVALID_METHOD_STATE: Code = Code::new("E060");
}

/// Compiler settings error codes
pub mod settings {
    use super::Code;

    pub const UNEXPECTED_SETTING_NAME: Code = Code::new("E070");
    pub const MALFORMED_SETTINGS: Code = Code::new("E071");
}

/// Batch driver error codes
pub mod batch {
    use super::Code;

    pub const BATCH_FAILURE: Code = Code::new("E080");
    pub const DISCOVERY_FAILED: Code = Code::new("E081");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");
    pub const TEMPLATE_COMPILED: Code = Code::new("I006");
    pub const MODULE_WRITTEN: Code = Code::new("I007");
    pub const BATCH_COMPLETED: Code = Code::new("I010");
    pub const PACKAGE_INIT_CREATED: Code = Code::new("I011");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

/// Error metadata registry using OnceLock for thread safety
static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

/// Initialize and get the error registry
fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let entries = [
            // System errors
            ErrorMetadata::new(
                "ERR001",
                "System",
                Severity::Critical,
                false,
                true,
                "Internal compiler error",
                "File a bug report with the template that triggered it",
            ),
            // File processing errors
            ErrorMetadata::new(
                "E005",
                "FileProcessing",
                Severity::Medium,
                false,
                false,
                "Template file not found",
                "Verify the path passed to the compiler",
            ),
            ErrorMetadata::new(
                "E007",
                "FileProcessing",
                Severity::Medium,
                false,
                false,
                "Template exceeds the configured size or line limit",
                "Split the template or raise the limit in the build profile",
            ),
            ErrorMetadata::new(
                "E010",
                "FileProcessing",
                Severity::Medium,
                false,
                false,
                "Template is not valid UTF-8",
                "Re-encode the template as UTF-8",
            ),
            ErrorMetadata::new(
                "E011",
                "FileProcessing",
                Severity::High,
                false,
                false,
                "I/O error while reading a template or writing its module",
                "Check file permissions and free disk space",
            ),
            // Lexical errors
            ErrorMetadata::new(
                "E020",
                "Lexical",
                Severity::High,
                false,
                false,
                "Embedded expression could not be tokenized",
                "Fix the expression at the reported column",
            ),
            ErrorMetadata::new(
                "E021",
                "Lexical",
                Severity::High,
                false,
                false,
                "Triple-quoted string is never closed",
                "Add the closing triple quote",
            ),
            // Syntax errors
            ErrorMetadata::new(
                "E040",
                "Syntax",
                Severity::High,
                false,
                false,
                "Template syntax error",
                "Fix the template at the reported line and column",
            ),
            ErrorMetadata::new(
                "E041",
                "Syntax",
                Severity::High,
                false,
                false,
                "Unknown directive name",
                "Escape the directive start token if it is literal text",
            ),
            // Codegen errors
            ErrorMetadata::new(
                "E060",
                "Codegen",
                Severity::High,
                false,
                false,
                "Statement not allowed in the current method",
                "Do not mix #return and #yield in one method",
            ),
            // Settings errors
            ErrorMetadata::new(
                "E070",
                "Settings",
                Severity::Medium,
                false,
                false,
                "Unknown compiler setting",
                "Check the setting name in the #compiler-settings block",
            ),
            ErrorMetadata::new(
                "E071",
                "Settings",
                Severity::Medium,
                false,
                false,
                "Settings line is not of the form name = value",
                "Rewrite the line as name = value",
            ),
            // Batch errors
            ErrorMetadata::new(
                "E080",
                "Batch",
                Severity::Medium,
                true,
                false,
                "One or more templates failed to compile",
                "Review the per-file diagnostics",
            ),
            ErrorMetadata::new(
                "E081",
                "Batch",
                Severity::Medium,
                true,
                false,
                "Directory could not be scanned for templates",
                "Check that the directory exists and is readable",
            ),
            // Success codes
            ErrorMetadata::new(
                "I004",
                "System",
                Severity::Low,
                true,
                false,
                "Logging initialized",
                "None",
            ),
            ErrorMetadata::new(
                "I006",
                "Compilation",
                Severity::Low,
                true,
                false,
                "Template compiled",
                "None",
            ),
            ErrorMetadata::new(
                "I007",
                "Compilation",
                Severity::Low,
                true,
                false,
                "Compiled module written",
                "None",
            ),
            ErrorMetadata::new(
                "I010",
                "Batch",
                Severity::Low,
                true,
                false,
                "Batch compilation finished",
                "None",
            ),
            ErrorMetadata::new(
                "I011",
                "Batch",
                Severity::Low,
                true,
                false,
                "Package __init__.py created",
                "None",
            ),
        ];

        entries
            .into_iter()
            .map(|metadata| (metadata.code, metadata))
            .collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get error metadata for a specific error code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get error severity from error code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Check if error is recoverable
pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

/// Check if error requires immediate halt
pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Get human-readable description for error code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

/// Get recommended action for error code
pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

/// Get error category from error code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_constant_has_metadata() {
        let all = [
            system::INTERNAL_ERROR,
            file_processing::FILE_NOT_FOUND,
            file_processing::SOURCE_TOO_LARGE,
            file_processing::INVALID_ENCODING,
            file_processing::IO_ERROR,
            lexical::INVALID_SYNTAX,
            lexical::MALFORMED_STRING,
            syntax::SYNTAX_ERROR,
            syntax::UNKNOWN_DIRECTIVE,
            codegen::INVALID_METHOD_STATE,
            settings::UNEXPECTED_SETTING_NAME,
            settings::MALFORMED_SETTINGS,
            batch::BATCH_FAILURE,
            batch::DISCOVERY_FAILED,
            success::SYSTEM_INITIALIZATION_COMPLETED,
            success::TEMPLATE_COMPILED,
            success::MODULE_WRITTEN,
            success::BATCH_COMPLETED,
            success::PACKAGE_INIT_CREATED,
        ];
        for code in all {
            assert!(
                get_error_metadata(code.as_str()).is_some(),
                "missing metadata for {}",
                code
            );
        }
    }

    #[test]
    fn test_unknown_code_fallbacks() {
        assert_eq!(get_description("Z999"), "Unknown error");
        assert_eq!(get_category("Z999"), "Unknown");
        assert_eq!(get_severity("Z999"), Severity::Medium);
        assert!(is_recoverable("Z999"));
        assert!(!requires_halt("Z999"));
    }

    #[test]
    fn test_internal_error_halts() {
        assert!(requires_halt(system::INTERNAL_ERROR.as_str()));
        assert_eq!(get_severity("ERR001"), Severity::Critical);
        assert_eq!(get_category("E041"), "Syntax");
    }
}
