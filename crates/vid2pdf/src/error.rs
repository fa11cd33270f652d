use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Vid2PdfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Failed to prepare output directory '{path}': {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write run summary '{path}': {reason}")]
    Report { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Required tool '{tool}' not found: {reason}")]
    ToolMissing { tool: String, reason: String },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No supported media files found in '{0}'")]
    NoJobsFound(PathBuf),

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Failure of a single stage of a single job.
///
/// These never escape the pipeline: the state machine converts them into a
/// terminal `Failed` state (or a cleanup warning).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("Frame extraction failed (exit code {}): {stderr_tail}", display_exit_code(.exit_code))]
    ExtractionFailed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Invalid frame set in '{dir}': {reason}")]
    InvalidFrameSet { dir: PathBuf, reason: String },

    #[error("Page assembly failed: {cause}")]
    AssemblyFailed { cause: String },

    #[error("Cleanup of '{path}' failed: {cause}")]
    CleanupFailed { path: PathBuf, cause: String },
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Nothing to merge: no job produced a document")]
    NothingToMerge,

    #[error("Input document '{path}' could not be loaded: {cause}")]
    CorruptInput { path: PathBuf, cause: String },

    #[error("Failed to write merged document '{path}': {cause}")]
    Write { path: PathBuf, cause: String },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Outcome for job #{0} was already recorded")]
    DuplicateOutcome(usize),

    #[error("No job at catalog position {0}")]
    UnknownJob(usize),

    #[error("Run summary is missing outcomes for {0} job(s)")]
    IncompleteSummary(usize),
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to open log file '{path}': {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

pub type Result<T> = std::result::Result<T, Vid2PdfError>;
