use std::sync::Mutex;

use tracing::{error, info, warn};

use crate::catalog::Job;

use super::state::JobState;

/// Events emitted by the pipeline while it drives a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Transition { from: JobState, to: JobState },
    CleanupWarning { message: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, job: &Job, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _job: &Job, _event: ProgressEvent) {}
}

/// Writes every transition to the log. Used for real runs.
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, job: &Job, event: ProgressEvent) {
        match event {
            ProgressEvent::Transition {
                to: JobState::Failed { stage, cause },
                ..
            } => {
                error!(
                    job = %job.file_name,
                    stage = %stage,
                    "Job failed: {}", cause
                );
            }
            ProgressEvent::Transition {
                from: JobState::Pending,
                to: JobState::Done,
            } => {
                info!(job = %job.file_name, "Already converted, skipping");
            }
            ProgressEvent::Transition { from, to } => {
                info!(job = %job.file_name, "{} -> {}", from, to);
            }
            ProgressEvent::CleanupWarning { message } => {
                warn!(job = %job.file_name, "Cleanup warning: {}", message);
            }
        }
    }
}

/// Keeps every event in memory, keyed by catalog position.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<(usize, ProgressEvent)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(usize, ProgressEvent)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// States a job went through, starting with `Pending`.
    pub fn states_for(&self, position: usize) -> Vec<JobState> {
        let mut states = vec![JobState::Pending];
        for (pos, event) in self.events() {
            if let (true, ProgressEvent::Transition { to, .. }) = (pos == position, event) {
                states.push(to);
            }
        }
        states
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, job: &Job, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((job.position, event));
        }
    }
}
