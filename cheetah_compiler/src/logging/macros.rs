//! Logging macros taking `Code` values and Display context pairs

/// Log error with Code type
#[macro_export]
macro_rules! log_error {
    ($code:expr, $message:expr) => {
        $crate::logging::log_error_with_context($code, $message, None, vec![])
    };

    ($code:expr, $message:expr, position = $position:expr) => {
        $crate::logging::log_error_with_context($code, $message, Some($position), vec![])
    };

    ($code:expr, $message:expr, $($key:expr => $value:expr),+) => {
        {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_error_with_context($code, $message, None, context_refs)
        }
    };

    ($code:expr, $message:expr, position = $position:expr, $($key:expr => $value:expr),+) => {
        {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_error_with_context($code, $message, Some($position), context_refs)
        }
    };
}

/// Log success with Code type
#[macro_export]
macro_rules! log_success {
    ($code:expr, $message:expr) => {
        $crate::logging::log_success_with_context($code, $message, vec![])
    };

    ($code:expr, $message:expr, $($key:expr => $value:expr),+) => {
        {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_success_with_context($code, $message, context_refs)
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at_level {
    ($level:expr, $message:expr) => {
        $crate::logging::log_with_level($level, $message, vec![])
    };

    ($level:expr, $message:expr, $($key:expr => $value:expr),+) => {
        {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_with_level($level, $message, context_refs)
        }
    };
}

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::__log_at_level!($crate::logging::LogLevel::Info, $($arg)+)
    };
}

/// Log warning message
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => {
        $crate::__log_at_level!($crate::logging::LogLevel::Warning, $($arg)+)
    };
}

/// Log debug message; skips formatting entirely below debug verbosity
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => {
        if $crate::logging::config::min_log_level() >= $crate::logging::LogLevel::Debug {
            $crate::__log_at_level!($crate::logging::LogLevel::Debug, $($arg)+)
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::logging::codes;
    use crate::utils::Position;

    #[test]
    fn test_macros_expand_without_global_logger() {
        let path = std::path::PathBuf::from("templates/foo.tmpl");

        log_error!(codes::syntax::SYNTAX_ERROR, "Invalid end directive",
            position = Position::new(4, 1, 5),
            "file" => path.display()
        );
        log_success!(codes::success::TEMPLATE_COMPILED, "Compiled template",
            "methods" => 3
        );
        log_info!("Compiling", "file" => path.display());
        log_warning!("You supplied an empty string for the source!");
        log_debug!("directive", "name" => "if", "line" => 3);
    }
}
