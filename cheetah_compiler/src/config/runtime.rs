// RUNTIME PREFERENCES (User Experience)

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerPreferences {
    /// Whether compiling an empty template logs a warning
    pub warn_on_empty_source: bool,

    /// Whether parser dispatch events are logged at debug level
    pub trace_directives: bool,
}

impl Default for CompilerPreferences {
    fn default() -> Self {
        Self {
            warn_on_empty_source: env::var(env_vars::WARN_ON_EMPTY_SOURCE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            trace_directives: env::var(env_vars::TRACE_DIRECTIVES)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPreferences {
    /// Worker threads for directory compilation (capped by the build profile)
    pub worker_threads: usize,

    /// Template file extension picked up when walking directories
    pub extension: String,

    /// Whether the first failing template aborts the batch
    pub fail_fast: bool,
}

impl Default for BatchPreferences {
    fn default() -> Self {
        Self {
            worker_threads: env::var(env_vars::BATCH_THREADS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            extension: env::var(env_vars::BATCH_EXTENSION).unwrap_or_else(|_| ".tmpl".to_string()),
            fail_fast: env::var(env_vars::BATCH_FAIL_FAST)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Whether to enable console output
    pub enable_console_logging: bool,

    /// Minimum level that reaches the logger
    pub min_log_level: LogLevel,

    /// Whether to include file context in log messages
    pub include_file_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var(env_vars::LOGGING_FORMAT)
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            enable_console_logging: env::var(env_vars::LOGGING_ENABLE_CONSOLE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Warning),
            include_file_context: env::var(env_vars::LOGGING_INCLUDE_FILE_CONTEXT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
pub fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub compiler: CompilerPreferences,
    pub batch: BatchPreferences,
    pub logging: LoggingPreferences,
}

/// Environment variable names for configuration
pub mod env_vars {
    // Compiler
    pub const WARN_ON_EMPTY_SOURCE: &str = "CHEETAH_WARN_ON_EMPTY_SOURCE";
    pub const TRACE_DIRECTIVES: &str = "CHEETAH_TRACE_DIRECTIVES";

    // Batch
    pub const BATCH_THREADS: &str = "CHEETAH_BATCH_THREADS";
    pub const BATCH_EXTENSION: &str = "CHEETAH_BATCH_EXTENSION";
    pub const BATCH_FAIL_FAST: &str = "CHEETAH_BATCH_FAIL_FAST";

    // Logging
    pub const LOGGING_FORMAT: &str = "CHEETAH_LOG_FORMAT";
    pub const LOGGING_ENABLE_CONSOLE: &str = "CHEETAH_LOG_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "CHEETAH_LOG_LEVEL";
    pub const LOGGING_INCLUDE_FILE_CONTEXT: &str = "CHEETAH_LOG_FILE_CONTEXT";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("ERROR"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("warn"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("2"), Some(LogLevel::Info));
        assert_eq!(parse_log_level("debug"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("verbose"), None);
    }

    #[test]
    fn test_log_level_ordering_matches_events() {
        assert!(LogLevel::Error < LogLevel::Debug);
        assert_eq!(
            LogLevel::Info.to_events_log_level(),
            crate::logging::events::LogLevel::Info
        );
    }

    #[test]
    fn test_runtime_config_serializes() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"batch\""));
        assert!(json.contains("\"min_log_level\""));
    }
}
