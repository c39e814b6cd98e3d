use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Record of one template compiled to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileOutput {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    /// `#def` and `#block` methods followed by the main method
    pub method_names: Vec<String>,
    pub compiled_at: DateTime<Utc>,
}

impl CompileOutput {
    pub fn new(source_path: PathBuf, output_path: PathBuf, method_names: Vec<String>) -> Self {
        Self {
            source_path,
            output_path,
            method_names,
            compiled_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
