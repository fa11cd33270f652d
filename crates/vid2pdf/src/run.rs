use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{error, info, info_span, warn};

use crate::catalog::JobCatalog;
use crate::error::{CatalogError, MergeError, Vid2PdfError};
use crate::logging::RunLog;
use crate::merge::{DocumentMerger, LopdfMerger, MergeCoordinator, MergeReport};
use crate::pipeline::{Pipeline, PipelineConfig, ProgressReporter, TracingProgress};
use crate::report;
use crate::stages::{FfmpegExtractor, FrameExtractor, PageAssembler, PdfPageAssembler};
use crate::worker::{RunSummary, Scheduler};

/// Exit code for errors that stop a run before it produces a summary.
pub const EXIT_FATAL: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every job is `Done` and the merged document was written.
    AllSucceeded,
    /// The merged document was written without the failed jobs.
    SomeFailed,
    /// The input directory held no supported files.
    NothingToDo,
    /// Every job failed.
    NothingToMerge,
    MergeFailed,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::AllSucceeded => 0,
            RunStatus::SomeFailed => 2,
            RunStatus::NothingToDo => 3,
            RunStatus::NothingToMerge => 4,
            RunStatus::MergeFailed => 5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub status: RunStatus,
    pub exit_code: i32,
    pub summary: RunSummary,
    pub merge: Option<MergeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_error: Option<String>,
}

/// One end-to-end run: scan, convert, merge, report.
pub struct Runner {
    extractor: Arc<dyn FrameExtractor>,
    assembler: Arc<dyn PageAssembler>,
    merger: Arc<dyn DocumentMerger>,
    progress: Arc<dyn ProgressReporter>,
}

impl Runner {
    /// Production collaborators: ffmpeg, lopdf assembly and lopdf merge.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(FfmpegExtractor::new(config.extraction.clone())),
            Arc::new(PdfPageAssembler::new(config.jpeg_quality)),
            Arc::new(LopdfMerger),
        )
    }

    pub fn new(
        extractor: Arc<dyn FrameExtractor>,
        assembler: Arc<dyn PageAssembler>,
        merger: Arc<dyn DocumentMerger>,
    ) -> Self {
        Self {
            extractor,
            assembler,
            merger,
            progress: Arc::new(TracingProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn run(&self, config: &PipelineConfig) -> Result<RunOutcome, Vid2PdfError> {
        let run = RunLog::start();
        run.append_banner(&config.log_file)?;

        let run_span = info_span!("run", run_id = %run.run_id);
        let _run = run_span.enter();
        info!(
            "Converting {} into {}",
            config.input_directory.display(),
            config.output_directory.display()
        );

        let layout = config.layout();
        for dir in [
            layout.root().to_path_buf(),
            layout.documents_root(),
            layout.frames_root(),
        ] {
            prepare_dir(&dir)?;
        }

        let catalog = JobCatalog::new(&config.input_directory, config.formats.clone(), layout);
        let jobs = match catalog.scan() {
            Ok(jobs) => jobs,
            Err(CatalogError::NoJobsFound(dir)) => {
                warn!("No supported videos found in {}", dir.display());
                discard_stale_merge(&config.merged_path());
                let empty = RunSummary::from_outcomes(Vec::new());
                let outcome = self.finish(&run, RunStatus::NothingToDo, empty, None, None);
                return self.report(outcome, config);
            }
            Err(e) => return Err(e.into()),
        };

        let pipeline = Pipeline::new(
            Arc::clone(&self.extractor),
            Arc::clone(&self.assembler),
            config.cleanup_on_assembly_failure,
        );
        let scheduler = Scheduler::new(
            Arc::new(pipeline),
            Arc::clone(&self.progress),
            config.worker_count,
        );
        let summary = scheduler.run(&jobs)?;

        let coordinator = MergeCoordinator::new(Arc::clone(&self.merger), config.merged_path());
        let outcome = match coordinator.merge(&summary) {
            Ok(merge) => {
                let status = if summary.failed() == 0 {
                    RunStatus::AllSucceeded
                } else {
                    RunStatus::SomeFailed
                };
                self.finish(&run, status, summary, Some(merge), None)
            }
            Err(MergeError::NothingToMerge) => {
                error!("Every job failed; nothing to merge");
                discard_stale_merge(&config.merged_path());
                self.finish(
                    &run,
                    RunStatus::NothingToMerge,
                    summary,
                    None,
                    Some(MergeError::NothingToMerge.to_string()),
                )
            }
            Err(e) => {
                error!("Merge failed: {}", e);
                discard_stale_merge(&config.merged_path());
                self.finish(&run, RunStatus::MergeFailed, summary, None, Some(e.to_string()))
            }
        };

        self.report(outcome, config)
    }

    fn finish(
        &self,
        run: &RunLog,
        status: RunStatus,
        summary: RunSummary,
        merge: Option<MergeReport>,
        merge_error: Option<String>,
    ) -> RunOutcome {
        RunOutcome {
            run_id: run.run_id.clone(),
            started_at: run.started_at,
            finished_at: Local::now(),
            exit_code: status.exit_code(),
            status,
            summary,
            merge,
            merge_error,
        }
    }

    fn report(
        &self,
        outcome: RunOutcome,
        config: &PipelineConfig,
    ) -> Result<RunOutcome, Vid2PdfError> {
        report::write_summary(&outcome, &config.summary_path())?;
        report::log_report(&outcome);
        Ok(outcome)
    }
}

/// Removes a merged document left by an earlier run when this run writes none.
fn discard_stale_merge(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => warn!("Removed stale merged document {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Failed to remove stale merged document {}: {}",
            path.display(),
            e
        ),
    }
}

fn prepare_dir(dir: &Path) -> Result<(), Vid2PdfError> {
    std::fs::create_dir_all(dir).map_err(|source| Vid2PdfError::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let statuses = [
            RunStatus::AllSucceeded,
            RunStatus::SomeFailed,
            RunStatus::NothingToDo,
            RunStatus::NothingToMerge,
            RunStatus::MergeFailed,
        ];
        let mut codes: Vec<i32> = statuses.iter().map(|s| s.exit_code()).collect();
        codes.push(EXIT_FATAL);
        let count = codes.len();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), count);
        assert_eq!(RunStatus::AllSucceeded.exit_code(), 0);
    }

    #[test]
    fn test_discard_stale_merge() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let merged = temp_dir.path().join("final_merged.pdf");
        std::fs::write(&merged, b"%PDF old").unwrap();

        discard_stale_merge(&merged);
        assert!(!merged.exists());

        // Nothing there is fine too.
        discard_stale_merge(&merged);
    }
}
