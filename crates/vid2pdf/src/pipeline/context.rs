use std::path::PathBuf;
use std::time::Instant;

use crate::catalog::Job;
use crate::stages::FrameSet;
use crate::worker::job::JobOutcome;

use super::error::{PipelineError, PipelineWarning};
use super::progress::{ProgressEvent, ProgressReporter};
use super::state::{JobState, Stage};

/// Working state of one job while the pipeline drives it.
pub struct PipelineContext<'a> {
    pub job: &'a Job,
    state: JobState,

    // Extract result
    pub frames: Option<FrameSet>,

    // Assemble result, or the existing document when skipped
    pub document: Option<PathBuf>,

    pub skipped: bool,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,

    started: Instant,
}

impl<'a> PipelineContext<'a> {
    pub fn new(job: &'a Job) -> Self {
        Self {
            job,
            state: JobState::Pending,
            frames: None,
            document: None,
            skipped: false,
            warnings: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Moves to `next`, reporting the transition. Rejects anything
    /// `JobState::can_transition_to` does not allow.
    pub fn transition(
        &mut self,
        next: JobState,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(&next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state.clone(),
                to: next,
            });
        }
        progress.report(
            self.job,
            ProgressEvent::Transition {
                from: self.state.clone(),
                to: next.clone(),
            },
        );
        self.state = next;
        Ok(())
    }

    pub fn fail(
        &mut self,
        stage: Stage,
        cause: impl ToString,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        self.transition(
            JobState::Failed {
                stage,
                cause: cause.to_string(),
            },
            progress,
        )
    }

    /// Marks the job failed without validation. Only for a pipeline that
    /// could not complete its own state machine.
    pub fn abort(&mut self, cause: impl ToString) {
        if !self.state.is_terminal() {
            self.state = JobState::Failed {
                stage: self.state.stage(),
                cause: cause.to_string(),
            };
        }
    }

    pub fn warn(&mut self, warning: PipelineWarning, progress: &dyn ProgressReporter) {
        progress.report(
            self.job,
            ProgressEvent::CleanupWarning {
                message: warning.to_string(),
            },
        );
        self.warnings.push(warning);
    }

    pub fn into_outcome(self) -> JobOutcome {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let cleanup_warning = self.warnings.first().map(|w| w.to_string());

        let mut outcome = match self.state {
            JobState::Done => match self.document {
                Some(document) => JobOutcome::done(self.job, document, self.skipped),
                None => JobOutcome::failed(self.job, Stage::Assemble, "no document was produced"),
            },
            JobState::Failed { stage, cause } => JobOutcome::failed(self.job, stage, cause),
            unfinished => JobOutcome::failed(
                self.job,
                unfinished.stage(),
                format!("pipeline stopped while {}", unfinished),
            ),
        };
        outcome.cleanup_warning = cleanup_warning;
        outcome.elapsed_ms = elapsed_ms;
        outcome
    }
}
