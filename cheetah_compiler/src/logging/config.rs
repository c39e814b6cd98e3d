//! Logging configuration
//!
//! The memory buffer and message length limits come from the build profile.
//! Level, output format and file context are runtime preferences, fixed the
//! first time any of them is read.

use crate::config::compile_time::logging::{LOG_BUFFER_SIZE, MAX_LOG_MESSAGE_LENGTH};
use crate::config::runtime::LoggingPreferences;
use crate::logging::events::LogLevel;
use std::sync::OnceLock;

static PREFERENCES: OnceLock<LoggingPreferences> = OnceLock::new();

/// Install preferences before the first log call; fails once they are fixed
pub fn init_runtime_preferences(preferences: LoggingPreferences) -> Result<(), String> {
    PREFERENCES
        .set(preferences)
        .map_err(|_| "Logging preferences already fixed".to_string())
}

fn preferences() -> &'static LoggingPreferences {
    PREFERENCES.get_or_init(LoggingPreferences::default)
}

pub fn min_log_level() -> LogLevel {
    preferences().min_log_level.to_events_log_level()
}

pub fn use_structured_logging() -> bool {
    preferences().use_structured_logging
}

pub fn use_console_logging() -> bool {
    preferences().enable_console_logging
}

pub fn include_file_context() -> bool {
    preferences().include_file_context
}

/// Events a [`super::MemoryLogger`] retains before dropping the oldest
pub fn memory_buffer_size() -> usize {
    LOG_BUFFER_SIZE
}

/// Messages longer than this are cut before they reach a logger
pub fn max_message_length() -> usize {
    MAX_LOG_MESSAGE_LENGTH
}

/// Reject profile limits that would make the logger useless
pub fn validate_config() -> Result<(), String> {
    if !(100..=100_000).contains(&LOG_BUFFER_SIZE) {
        return Err(format!(
            "Log buffer size {} outside 100..=100000",
            LOG_BUFFER_SIZE
        ));
    }
    if MAX_LOG_MESSAGE_LENGTH < 80 {
        return Err(format!(
            "Max log message length {} below 80",
            MAX_LOG_MESSAGE_LENGTH
        ));
    }
    Ok(())
}
