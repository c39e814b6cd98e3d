use crate::config::SettingsError;
use crate::logging::{codes, Code};
use crate::syntax::ParseError;

/// Pipeline processing errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Template source is {size} bytes (max: {max})")]
    SourceTooLarge { size: u64, max: u64 },

    #[error("Template source has {lines} lines (max: {max})")]
    TooManyLines { lines: usize, max: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Invalid compiler settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Template is not valid UTF-8: {path}")]
    InvalidEncoding { path: String },

    #[error("Compilation would overwrite the source file: {path}")]
    WouldOverwriteSource { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            PipelineError::SourceTooLarge { .. } | PipelineError::TooManyLines { .. } => {
                codes::file_processing::SOURCE_TOO_LARGE
            }
            PipelineError::Parse(error) => error.error_code(),
            PipelineError::Settings(error) => error.error_code(),
            PipelineError::InvalidEncoding { .. } => codes::file_processing::INVALID_ENCODING,
            PipelineError::WouldOverwriteSource { .. } => codes::file_processing::IO_ERROR,
            PipelineError::Io(error) if error.kind() == std::io::ErrorKind::NotFound => {
                codes::file_processing::FILE_NOT_FOUND
            }
            PipelineError::Io(_) => codes::file_processing::IO_ERROR,
        }
    }
}
