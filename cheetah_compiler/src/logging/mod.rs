//! Global logging module for the template compiler
//!
//! Provides thread-safe global logging with a per-thread file context so
//! that events emitted while compiling a template carry its path.

pub mod codes;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{ConsoleLogger, Logger, LoggingService, MemoryLogger, StructuredLogger};

// ============================================================================
// GLOBAL STATE
// ============================================================================

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

thread_local! {
    static FILE_CONTEXT: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize global logging system
pub fn init_global_logging() -> Result<(), String> {
    config::validate_config().map_err(|e| format!("Configuration validation failed: {}", e))?;

    let logging_service = Arc::new(service::create_configured_service());

    GLOBAL_LOGGER
        .set(logging_service.clone())
        .map_err(|_| "Global logger already initialized")?;

    for code in [
        codes::system::INTERNAL_ERROR,
        codes::lexical::INVALID_SYNTAX,
        codes::syntax::SYNTAX_ERROR,
    ] {
        if codes::get_description(code.as_str()) == "Unknown error" {
            return Err(format!("Missing metadata for error code: {}", code));
        }
    }

    logging_service.log_event(LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    ));

    Ok(())
}

/// Initialize with custom service (primarily for testing)
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), String> {
    GLOBAL_LOGGER
        .set(service)
        .map_err(|_| "Global logger already initialized".to_string())
}

/// Safe access to global logger
pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

/// Process-wide capture logger for tests that assert on emitted events
#[cfg(test)]
pub(crate) fn test_capture() -> Arc<MemoryLogger> {
    static CAPTURE: OnceLock<Arc<MemoryLogger>> = OnceLock::new();
    CAPTURE
        .get_or_init(|| {
            let logger = Arc::new(MemoryLogger::new());
            let service = LoggingService::new(logger.clone(), LogLevel::Debug);
            let _ = init_global_logging_with_service(Arc::new(service));
            logger
        })
        .clone()
}

// ============================================================================
// FILE CONTEXT MANAGEMENT
// ============================================================================

/// Execute function with the template path attached to every event it logs
pub fn with_file_context<F, R>(file_path: PathBuf, f: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = FILE_CONTEXT.with(|ctx| ctx.replace(Some(file_path)));
    let result = f();
    FILE_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = previous;
    });
    result
}

/// Get current file context (used by macros)
pub fn get_current_file_context() -> Option<PathBuf> {
    FILE_CONTEXT.with(|ctx| ctx.borrow().clone())
}

fn attach_file_context(event: LogEvent) -> LogEvent {
    if !config::include_file_context() {
        return event;
    }
    match get_current_file_context() {
        Some(path) => event.with_file_path(&path.display().to_string()),
        None => event,
    }
}

fn dispatch(event: LogEvent) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(attach_file_context(event));
    }
}

// ============================================================================
// MACRO SUPPORT FUNCTIONS
// ============================================================================

/// Log error with context (used by log_error! macro)
pub fn log_error_with_context(
    code: Code,
    message: &str,
    position: Option<crate::utils::Position>,
    context: Vec<(&str, &str)>,
) {
    let mut event = LogEvent::error(code, message);
    if let Some(position) = position {
        event = event.with_position(position);
    }
    for (key, value) in context {
        event = event.with_context(key, value);
    }
    dispatch(event);
}

/// Log success with context (used by log_success! macro)
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    let mut event = LogEvent::success(code, message);
    for (key, value) in context {
        event = event.with_context(key, value);
    }
    dispatch(event);
}

/// Log at a level without a specific code (used by log_info!, log_warning!
/// and log_debug!)
pub fn log_with_level(level: LogLevel, message: &str, context: Vec<(&str, &str)>) {
    let mut event = match level {
        LogLevel::Error => LogEvent::error(codes::system::INTERNAL_ERROR, message),
        LogLevel::Warning => LogEvent::warning(message),
        LogLevel::Info => LogEvent::info(message),
        LogLevel::Debug => LogEvent::debug(message),
    };
    for (key, value) in context {
        event = event.with_context(key, value);
    }
    dispatch(event);
}

// ============================================================================
// SAFE FALLBACK LOGGING
// ============================================================================

/// Safe error logging (won't panic if uninitialized)
pub fn safe_log_error(code: Code, message: &str) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(LogEvent::error(code, message));
    } else {
        eprintln!("[ERROR] FALLBACK: [{}] {}", code.as_str(), message);
    }
}
