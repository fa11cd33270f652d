use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::{Job, OrderingKey};
use crate::pipeline::state::{JobState, Stage};

/// Terminal result of one job, as recorded in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub position: usize,
    pub file_name: String,
    pub source_path: PathBuf,
    pub ordering_key: OrderingKey,
    pub state: JobState,
    /// Set when the job is `Done`.
    pub document_path: Option<PathBuf>,
    /// The document existed before the run; no stage ran.
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_warning: Option<String>,
    pub elapsed_ms: u64,
}

impl JobOutcome {
    pub fn done(job: &Job, document_path: PathBuf, skipped: bool) -> Self {
        Self {
            state: JobState::Done,
            document_path: Some(document_path),
            skipped,
            ..Self::base(job)
        }
    }

    pub fn failed(job: &Job, stage: Stage, cause: impl Into<String>) -> Self {
        Self {
            state: JobState::Failed {
                stage,
                cause: cause.into(),
            },
            ..Self::base(job)
        }
    }

    fn base(job: &Job) -> Self {
        Self {
            position: job.position,
            file_name: job.file_name.clone(),
            source_path: job.source_path.clone(),
            ordering_key: job.ordering_key,
            state: JobState::Pending,
            document_path: None,
            skipped: false,
            cleanup_warning: None,
            elapsed_ms: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, JobState::Done)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, JobState::Failed { .. })
    }

    /// Stage and cause of a failed job.
    pub fn failure(&self) -> Option<(Stage, &str)> {
        match &self.state {
            JobState::Failed { stage, cause } => Some((*stage, cause.as_str())),
            _ => None,
        }
    }
}
