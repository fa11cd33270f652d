use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::state::JobState;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidTransition { from: JobState, to: JobState },
}

/// Problems that do not change a job's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    CleanupFailed { path: PathBuf, error: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::CleanupFailed { path, error } => {
                write!(f, "could not remove frames in '{}': {}", path.display(), error)
            }
        }
    }
}
