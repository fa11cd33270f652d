pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod run;
pub mod stages;
pub mod worker;

pub use catalog::{Job, JobCatalog, OrderingKey, OutputLayout};
pub use config::{load_config, Config};
pub use error::{
    CatalogError, ConfigError, LoggingError, MergeError, Result, StageError, Vid2PdfError,
    WorkerError,
};
pub use logging::{init_logging, LoggingConfig, RunLog};
pub use merge::{DocumentMerger, LopdfMerger, MergeCoordinator, MergeReport};
pub use pipeline::{JobState, Pipeline, PipelineConfig, ProgressReporter, Stage};
pub use run::{RunOutcome, RunStatus, Runner, EXIT_FATAL};
pub use stages::{check_ffmpeg, FfmpegExtractor, FrameExtractor, PageAssembler, PdfPageAssembler};
pub use worker::{JobOutcome, RunSummary, Scheduler};
