// build.rs - TOML-driven compile-time limit generation
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    source: SourceLimits,
    lexical: LexicalLimits,
    syntax: SyntaxLimits,
    batch_processing: BatchProcessingLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct SourceLimits {
    max_source_size: u64,
    max_line_count: usize,
}

#[derive(serde::Deserialize)]
struct LexicalLimits {
    max_enclosure_depth: usize,
}

#[derive(serde::Deserialize)]
struct SyntaxLimits {
    max_directive_depth: usize,
    max_method_depth: usize,
}

#[derive(serde::Deserialize)]
struct BatchProcessingLimits {
    max_worker_threads: usize,
    max_files_per_batch: usize,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    log_buffer_size: usize,
    max_log_message_length: usize,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=CHEETAH_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=CHEETAH_CONFIG_DIR");

    let profile =
        env::var("CHEETAH_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("CHEETAH_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Workspace root is the parent of the cheetah_compiler directory
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_limits(&config, &profile);
    generate_constants(&config, &profile);
}

fn validate_limits(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_SOURCE_SIZE: u64 = 256 * 1024 * 1024;
    const ABSOLUTE_MAX_NESTING: usize = 4096;

    if config.source.max_source_size > ABSOLUTE_MAX_SOURCE_SIZE {
        panic!("LIMITS: max_source_size exceeds absolute maximum");
    }

    if config.lexical.max_enclosure_depth == 0
        || config.lexical.max_enclosure_depth > ABSOLUTE_MAX_NESTING
    {
        panic!("LIMITS: max_enclosure_depth must be within 1..={}", ABSOLUTE_MAX_NESTING);
    }

    if config.syntax.max_directive_depth == 0
        || config.syntax.max_directive_depth > ABSOLUTE_MAX_NESTING
    {
        panic!("LIMITS: max_directive_depth must be within 1..={}", ABSOLUTE_MAX_NESTING);
    }

    if config.syntax.max_method_depth == 0 {
        panic!("LIMITS: max_method_depth must allow at least one nested #def");
    }

    if config.batch_processing.max_worker_threads == 0 {
        panic!("LIMITS: max_worker_threads must be at least 1");
    }

    if config.logging.max_log_message_length < 80 {
        panic!("LIMITS: max_log_message_length too small (min: 80)");
    }

    if profile == "production" && config.source.max_source_size > 16 * 1024 * 1024 {
        panic!("PRODUCTION: max_source_size too high for production");
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod source {{
        pub const MAX_SOURCE_SIZE: u64 = {};
        pub const MAX_LINE_COUNT: usize = {};
    }}

    pub mod lexical {{
        pub const MAX_ENCLOSURE_DEPTH: usize = {};
    }}

    pub mod syntax {{
        pub const MAX_DIRECTIVE_DEPTH: usize = {};
        pub const MAX_METHOD_DEPTH: usize = {};
    }}

    pub mod batch_processing {{
        pub const MAX_WORKER_THREADS: usize = {};
        pub const MAX_FILES_PER_BATCH: usize = {};
    }}

    pub mod logging {{
        pub const LOG_BUFFER_SIZE: usize = {};
        pub const MAX_LOG_MESSAGE_LENGTH: usize = {};
    }}
}}
"#,
        profile,
        config.source.max_source_size,
        config.source.max_line_count,
        config.lexical.max_enclosure_depth,
        config.syntax.max_directive_depth,
        config.syntax.max_method_depth,
        config.batch_processing.max_worker_threads,
        config.batch_processing.max_files_per_batch,
        config.logging.log_buffer_size,
        config.logging.max_log_message_length,
    );

    fs::write(output_path, constants_code).unwrap();
}
