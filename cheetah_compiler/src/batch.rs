//! Batch compilation of template trees
//!
//! Walks files and directories, compiles every template found next to its
//! source and makes each visited directory an importable Python package.
//! Runs sequentially or on a fixed set of worker threads.

use crate::config::compile_time::batch_processing::{MAX_FILES_PER_BATCH, MAX_WORKER_THREADS};
use crate::config::runtime::BatchPreferences;
use crate::config::CompilerSettings;
use crate::logging::{codes, Code};
use crate::pipeline::{self, CompileOutput, PipelineError};
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const PACKAGE_INIT: &str = "__init__.py";
const BYTECODE_CACHE_DIR: &str = "__pycache__";

// ============================================================================
// BATCH PROCESSING TYPES
// ============================================================================

/// Batch processing configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_threads: usize,
    /// Suffix of template file names, dot included
    pub extension: String,
    pub fail_fast: bool,
    /// Print `Compiling FILE` for every template
    pub progress_reporting: bool,
    pub settings: CompilerSettings,
}

impl BatchConfig {
    pub fn from_preferences(preferences: &BatchPreferences) -> Self {
        Self {
            max_threads: preferences.worker_threads.clamp(1, MAX_WORKER_THREADS),
            extension: preferences.extension.clone(),
            fail_fast: preferences.fail_fast,
            progress_reporting: true,
            settings: CompilerSettings::default(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from_preferences(&BatchPreferences::default())
    }
}

/// Batch processing results
#[derive(Debug, Default)]
pub struct BatchResults {
    pub successful_files: Vec<CompileOutput>,
    pub failed_files: Vec<(PathBuf, PipelineError)>,
    /// `__init__.py` files created while walking directories
    pub package_inits_created: Vec<PathBuf>,
    pub processing_duration: Duration,
    pub files_processed: usize,
    pub files_discovered: usize,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> usize {
        self.successful_files.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_files.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed_files.is_empty()
    }

    pub fn add_success(&mut self, output: CompileOutput) {
        self.successful_files.push(output);
        self.files_processed += 1;
    }

    pub fn add_failure(&mut self, file_path: PathBuf, error: PipelineError) {
        self.failed_files.push((file_path, error));
        self.files_processed += 1;
    }

    pub fn merge(&mut self, other: BatchResults) {
        self.successful_files.extend(other.successful_files);
        self.failed_files.extend(other.failed_files);
        self.files_processed += other.files_processed;
    }

    fn sort(&mut self) {
        self.successful_files
            .sort_by(|a, b| a.source_path.cmp(&b.source_path));
        self.failed_files.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pub fn summary(&self) -> String {
        format!(
            "Compiled {} of {} templates, {} failed, {:.2}s total",
            self.success_count(),
            self.files_discovered,
            self.failure_count(),
            self.processing_duration.as_secs_f64()
        )
    }
}

/// Batch processing errors
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("Too many templates found: {count} (max: {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("IO error during directory traversal of {path}: {error}")]
    IoError { path: String, error: String },

    #[error("Thread pool error: {message}")]
    ThreadError { message: String },
}

impl BatchError {
    /// Get error code for global logging system
    pub fn error_code(&self) -> Code {
        match self {
            BatchError::PathNotFound { .. } => codes::file_processing::FILE_NOT_FOUND,
            BatchError::TooManyFiles { .. } | BatchError::IoError { .. } => codes::batch::DISCOVERY_FAILED,
            BatchError::ThreadError { .. } => codes::system::INTERNAL_ERROR,
        }
    }

    fn io(path: &Path, error: std::io::Error) -> Self {
        BatchError::IoError {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// Templates under `paths`, in sorted order. Files named directly are taken
/// whatever their extension; directories are walked recursively and get an
/// `__init__.py` unless they are bytecode caches.
pub fn discover_templates(
    paths: &[PathBuf],
    config: &BatchConfig,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>), BatchError> {
    let mut files = Vec::new();
    let mut inits = Vec::new();

    for path in paths {
        crate::log_info!("Starting template discovery", "path" => path.display());
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            visit_directory(path, config, &mut files, &mut inits)?;
        } else {
            return Err(BatchError::PathNotFound {
                path: path.display().to_string(),
            });
        }

        if files.len() > MAX_FILES_PER_BATCH {
            return Err(BatchError::TooManyFiles {
                count: files.len(),
                max: MAX_FILES_PER_BATCH,
            });
        }
    }

    files.sort();
    files.dedup();

    crate::log_info!("Template discovery completed",
        "templates_found" => files.len(),
        "package_inits_created" => inits.len()
    );

    Ok((files, inits))
}

fn visit_directory(
    dir_path: &Path,
    config: &BatchConfig,
    files: &mut Vec<PathBuf>,
    inits: &mut Vec<PathBuf>,
) -> Result<(), BatchError> {
    if dir_path.file_name() != Some(OsStr::new(BYTECODE_CACHE_DIR)) {
        if let Some(created) = touch_package_init(dir_path)? {
            inits.push(created);
        }
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(dir_path)
        .map_err(|e| BatchError::io(dir_path, e))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<_, _>>()
        .map_err(|e| BatchError::io(dir_path, e))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            visit_directory(&path, config, files, inits)?;
        } else if is_template(&path, &config.extension) {
            files.push(path);
        }
    }

    Ok(())
}

/// Create `dir/__init__.py` when missing; returns its path when created
fn touch_package_init(dir_path: &Path) -> Result<Option<PathBuf>, BatchError> {
    let init = dir_path.join(PACKAGE_INIT);
    if init.exists() {
        return Ok(None);
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&init)
        .map_err(|e| BatchError::io(&init, e))?;

    crate::log_success!(
        codes::success::PACKAGE_INIT_CREATED,
        "Created package init",
        "path" => init.display()
    );
    Ok(Some(init))
}

fn is_template(path: &Path, extension: &str) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(extension) && name.len() > extension.len())
}

// ============================================================================
// COMPILATION
// ============================================================================

fn compile_one(file_path: &Path, config: &BatchConfig) -> Result<CompileOutput, PipelineError> {
    if config.progress_reporting {
        println!("Compiling {}", file_path.display());
    }
    let result = pipeline::compile_file(file_path, None, &config.settings);
    if let Err(error) = &result {
        crate::log_error!(
            codes::batch::BATCH_FAILURE,
            "Template failed to compile",
            "file" => file_path.display(),
            "error_code" => error.error_code()
        );
    }
    result
}

/// Compile files one after another
pub fn compile_sequential(files: &[PathBuf], config: &BatchConfig) -> BatchResults {
    let mut results = BatchResults::new();

    for file_path in files {
        match compile_one(file_path, config) {
            Ok(output) => results.add_success(output),
            Err(error) => {
                results.add_failure(file_path.clone(), error);
                if config.fail_fast {
                    crate::log_warning!("Fail-fast mode enabled, stopping batch processing");
                    break;
                }
            }
        }
    }

    results
}

/// Compile files on `config.max_threads` worker threads
pub fn compile_parallel(files: &[PathBuf], config: &BatchConfig) -> Result<BatchResults, BatchError> {
    if files.is_empty() {
        return Ok(BatchResults::new());
    }

    let threads = config.max_threads.clamp(1, MAX_WORKER_THREADS);
    let files_per_thread = files.len().div_ceil(threads);
    let results = Arc::new(Mutex::new(BatchResults::new()));
    let stop = Arc::new(AtomicBool::new(false));
    let config = Arc::new(config.clone());

    crate::log_debug!("Parallel compilation configuration",
        "total_files" => files.len(),
        "files_per_thread" => files_per_thread,
        "threads" => threads
    );

    let handles: Vec<_> = files
        .chunks(files_per_thread)
        .map(|chunk| {
            let thread_files = chunk.to_vec();
            let results = Arc::clone(&results);
            let stop = Arc::clone(&stop);
            let config = Arc::clone(&config);

            thread::spawn(move || {
                let mut local = BatchResults::new();
                for file_path in thread_files {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    match compile_one(&file_path, &config) {
                        Ok(output) => local.add_success(output),
                        Err(error) => {
                            local.add_failure(file_path, error);
                            if config.fail_fast {
                                stop.store(true, Ordering::Relaxed);
                            }
                        }
                    }
                }
                merge_worker_results(&results, local)
            })
        })
        .collect();

    for handle in handles {
        handle.join().map_err(|_| BatchError::ThreadError {
            message: "Worker thread panicked during compilation".to_string(),
        })??;
    }

    if stop.load(Ordering::Relaxed) {
        crate::log_warning!("Fail-fast mode enabled, stopping batch processing");
    }

    let results = Arc::try_unwrap(results)
        .map_err(|_| BatchError::ThreadError {
            message: "Failed to extract results from worker threads".to_string(),
        })?
        .into_inner()
        .map_err(|_| BatchError::ThreadError {
            message: "Results lock poisoned".to_string(),
        })?;

    Ok(results)
}

fn merge_worker_results(results: &Mutex<BatchResults>, local: BatchResults) -> Result<(), BatchError> {
    let mut guard = results.lock().map_err(|_| BatchError::ThreadError {
        message: "Results lock poisoned".to_string(),
    })?;
    guard.merge(local);
    Ok(())
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Discover and compile every template under `paths`
pub fn compile_paths(paths: &[PathBuf], config: &BatchConfig) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();

    let (files, inits) = match discover_templates(paths, config) {
        Ok(found) => found,
        Err(error) => {
            crate::log_error!(error.error_code(), "Template discovery failed",
                "error" => error
            );
            return Err(error);
        }
    };

    let mut results = if config.max_threads <= 1 {
        compile_sequential(&files, config)
    } else {
        compile_parallel(&files, config)?
    };
    results.sort();
    results.files_discovered = files.len();
    results.package_inits_created = inits;
    results.processing_duration = start_time.elapsed();

    crate::log_success!(
        codes::success::BATCH_COMPLETED,
        "Batch compilation completed",
        "files_processed" => results.files_processed,
        "successful" => results.success_count(),
        "failed" => results.failure_count(),
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn quiet_config(max_threads: usize) -> BatchConfig {
        BatchConfig {
            max_threads,
            extension: ".tmpl".to_string(),
            fail_fast: false,
            progress_reporting: false,
            settings: CompilerSettings::default(),
        }
    }

    #[test]
    fn test_discovery_touches_package_inits() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::create_dir_all(root.join(BYTECODE_CACHE_DIR)).unwrap();
        fs::write(root.join("a.tmpl"), "a").unwrap();
        fs::write(root.join("sub/b.tmpl"), "b").unwrap();
        fs::write(root.join("notes.txt"), "not a template").unwrap();

        let (files, inits) = discover_templates(&[root.to_path_buf()], &quiet_config(1)).unwrap();
        assert_eq!(files, vec![root.join("a.tmpl"), root.join("sub/b.tmpl")]);
        assert_eq!(inits.len(), 2);
        assert!(root.join(PACKAGE_INIT).exists());
        assert!(root.join("sub").join(PACKAGE_INIT).exists());
        assert!(!root.join(BYTECODE_CACHE_DIR).join(PACKAGE_INIT).exists());

        let (_, inits) = discover_templates(&[root.to_path_buf()], &quiet_config(1)).unwrap();
        assert!(inits.is_empty());
    }

    #[test]
    fn test_missing_path() {
        let temp_dir = tempdir().unwrap();
        assert_matches!(
            discover_templates(&[temp_dir.path().join("nope")], &quiet_config(1)),
            Err(BatchError::PathNotFound { .. })
        );
    }

    #[test]
    fn test_is_template() {
        let temp_dir = tempdir().unwrap();
        let template = temp_dir.path().join("page.tmpl");
        fs::write(&template, "x").unwrap();
        assert!(is_template(&template, ".tmpl"));
        assert!(!is_template(&template, ".html"));
        assert!(!is_template(temp_dir.path(), ".tmpl"));
    }

    #[test]
    fn test_sequential_compiles_and_reports_failures() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("good.tmpl"), "Hello $name\n").unwrap();
        fs::write(root.join("bad.tmpl"), "#if True\n").unwrap();

        let results = compile_paths(&[root.to_path_buf()], &quiet_config(1)).unwrap();
        assert_eq!(results.files_discovered, 2);
        assert_eq!(results.success_count(), 1);
        assert_eq!(results.failure_count(), 1);
        assert!(!results.is_success());
        assert!(root.join("good.py").exists());
        assert!(!root.join("bad.py").exists());
        assert_eq!(results.failed_files[0].0, root.join("bad.tmpl"));
        assert_matches!(&results.failed_files[0].1, PipelineError::Parse(_));
    }

    #[test]
    fn test_fail_fast_stops_sequential_batch() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.tmpl"), "#end if\n").unwrap();
        fs::write(root.join("b.tmpl"), "fine").unwrap();

        let mut config = quiet_config(1);
        config.fail_fast = true;
        let results = compile_paths(&[root.to_path_buf()], &config).unwrap();
        assert_eq!(results.files_processed, 1);
        assert_eq!(results.failure_count(), 1);
        assert!(!root.join("b.py").exists());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        for index in 0..7 {
            fs::write(root.join(format!("t{}.tmpl", index)), format!("#def f{}()\n#end def\n", index)).unwrap();
        }

        let results = compile_paths(&[root.to_path_buf()], &quiet_config(3)).unwrap();
        assert!(results.is_success());
        assert_eq!(results.success_count(), 7);
        let names: Vec<String> = results
            .successful_files
            .iter()
            .map(|output| output.method_names[0].clone())
            .collect();
        assert_eq!(names, (0..7).map(|index| format!("f{}", index)).collect::<Vec<_>>());
    }

    #[test]
    fn test_poisoned_results_lock_is_reported() {
        let results = Arc::new(Mutex::new(BatchResults::new()));
        let poisoner = Arc::clone(&results);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("worker died holding the results lock");
        })
        .join();

        let mut local = BatchResults::new();
        local.add_failure(PathBuf::from("a.tmpl"), PipelineError::Io(std::io::ErrorKind::Other.into()));
        assert_matches!(
            merge_worker_results(&results, local),
            Err(BatchError::ThreadError { .. })
        );
    }

    #[test]
    fn test_batch_config_from_preferences() {
        let preferences = BatchPreferences {
            worker_threads: 1000,
            extension: ".cheetah".to_string(),
            fail_fast: true,
        };
        let config = BatchConfig::from_preferences(&preferences);
        assert_eq!(config.max_threads, MAX_WORKER_THREADS);
        assert_eq!(config.extension, ".cheetah");
        assert!(config.fail_fast);
    }
}
