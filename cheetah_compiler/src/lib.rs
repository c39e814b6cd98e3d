// Internal modules
pub mod batch;
pub mod codegen;
pub mod config;
pub mod grammar;
pub mod lexical;
#[macro_use]
pub mod logging;
pub mod pipeline;
pub mod syntax;
pub mod tokens;
pub mod utils;

// Re-export key types for library consumers
pub use batch::{BatchConfig, BatchError, BatchResults};
pub use config::CompilerSettings;
pub use pipeline::{compile_file, compile_source, CompileOutput, PipelineError};
pub use syntax::{ParseError, Parser};
