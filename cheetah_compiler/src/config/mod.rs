//! Configuration module for the template compiler
//!
//! Three layers: compile-time limits generated by build.rs from the TOML
//! profile, runtime preferences read from `CHEETAH_*` environment variables,
//! and the per-compilation [`settings::CompilerSettings`].

// Include generated constants from build.rs
include!(concat!(env!("OUT_DIR"), "/constants.rs"));

pub mod runtime;
pub mod settings;

pub use settings::{CompilerSettings, SettingValue, SettingsError};

/// Build information and configuration metadata
pub mod build_info {
    /// Returns the configuration profile used during build
    pub fn profile() -> &'static str {
        option_env!("CHEETAH_BUILD_PROFILE").unwrap_or("development")
    }

    /// Returns the configuration directory used during build
    pub fn config_dir() -> &'static str {
        option_env!("CHEETAH_CONFIG_DIR").unwrap_or("config")
    }

    /// Returns configuration source information
    pub fn source_info() -> String {
        format!("Generated from {}/{}.toml", config_dir(), profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_limits_are_sane() {
        assert!(compile_time::source::MAX_SOURCE_SIZE > 0);
        assert!(compile_time::lexical::MAX_ENCLOSURE_DEPTH > 0);
        assert!(compile_time::syntax::MAX_DIRECTIVE_DEPTH > 0);
        assert!(compile_time::syntax::MAX_METHOD_DEPTH > 0);
        assert!(compile_time::batch_processing::MAX_WORKER_THREADS > 0);
    }

    #[test]
    fn test_source_info_names_profile() {
        assert!(build_info::source_info().ends_with(&format!("{}.toml", build_info::profile())));
    }
}
