use std::sync::Arc;

use tracing::{debug, error, info_span};

use crate::catalog::Job;
use crate::error::StageError;
use crate::stages::{document_exists, remove_frames, FrameExtractor, PageAssembler};
use crate::worker::job::JobOutcome;

use super::context::PipelineContext;
use super::error::{PipelineError, PipelineWarning};
use super::progress::ProgressReporter;
use super::state::{JobState, Stage};

/// Drives one job through extract, assemble and cleanup.
pub struct Pipeline {
    extractor: Arc<dyn FrameExtractor>,
    assembler: Arc<dyn PageAssembler>,
    cleanup_on_assembly_failure: bool,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn FrameExtractor>,
        assembler: Arc<dyn PageAssembler>,
        cleanup_on_assembly_failure: bool,
    ) -> Self {
        Self {
            extractor,
            assembler,
            cleanup_on_assembly_failure,
        }
    }

    /// Runs a job to a terminal state. Stage errors never escape: they become
    /// `Failed` outcomes, and cleanup errors become warnings.
    pub fn run(&self, job: &Job, progress: &dyn ProgressReporter) -> JobOutcome {
        let _pipeline_span = info_span!("pipeline",
            job = %job.file_name,
            key = %job.ordering_key,
        )
        .entered();

        let mut ctx = PipelineContext::new(job);
        if let Err(e) = self.drive(&mut ctx, progress) {
            error!("Pipeline error for {}: {}", job.file_name, e);
            ctx.abort(e);
        }
        ctx.into_outcome()
    }

    /// Builds the outcome for a job whose stage panicked, cleaning up frames
    /// the same way a failed assembly would.
    pub fn recover_from_panic(&self, job: &Job, stage: Stage, message: &str) -> JobOutcome {
        error!("Job {} panicked during {}: {}", job.file_name, stage, message);
        let mut outcome = JobOutcome::failed(job, stage, format!("panicked: {}", message));
        if stage != Stage::Assemble || self.cleanup_on_assembly_failure {
            if let Err(e) = remove_frames(job) {
                outcome.cleanup_warning = Some(e.to_string());
            }
        }
        outcome
    }

    fn drive(
        &self,
        ctx: &mut PipelineContext<'_>,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let job = ctx.job;

        if document_exists(&job.document_path) {
            ctx.skipped = true;
            ctx.document = Some(job.document_path.clone());
            // A run interrupted between assembly and cleanup leaves frames
            // next to a finished document.
            self.step_cleanup(ctx, progress);
            return ctx.transition(JobState::Done, progress);
        }

        // Step 1: Extract frames
        ctx.transition(JobState::Extracting, progress)?;
        {
            let _step = info_span!("extract").entered();
            match self.extractor.extract(job) {
                Ok(frames) => {
                    debug!("{} frames ready", frames.len());
                    ctx.frames = Some(frames);
                }
                Err(e) => return ctx.fail(Stage::Extract, e, progress),
            }
        }

        // Step 2: Assemble pages
        ctx.transition(JobState::Assembling, progress)?;
        let assembled = {
            let _step = info_span!("assemble").entered();
            match ctx.frames.as_ref() {
                Some(frames) => self.assembler.assemble(job, frames),
                None => Err(StageError::AssemblyFailed {
                    cause: "no frames were extracted".to_string(),
                }),
            }
        };

        let document = match assembled {
            Ok(document) => document,
            Err(e) => {
                if self.cleanup_on_assembly_failure {
                    self.step_cleanup(ctx, progress);
                }
                return ctx.fail(Stage::Assemble, e, progress);
            }
        };
        ctx.document = Some(document);

        // Step 3: Remove frames
        ctx.transition(JobState::CleaningUp, progress)?;
        self.step_cleanup(ctx, progress);

        ctx.transition(JobState::Done, progress)
    }

    fn step_cleanup(&self, ctx: &mut PipelineContext<'_>, progress: &dyn ProgressReporter) {
        let _step = info_span!("cleanup").entered();
        if let Err(e) = remove_frames(ctx.job) {
            let path = match &e {
                StageError::CleanupFailed { path, .. } => path.clone(),
                _ => ctx.job.frame_dir.clone(),
            };
            ctx.warn(
                PipelineWarning::CleanupFailed {
                    path,
                    error: e.to_string(),
                },
                progress,
            );
        }
        ctx.frames = None;
    }
}
